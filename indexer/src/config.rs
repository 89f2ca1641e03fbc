/// Configuration for the Ethereum transfer indexer.

use std::env;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Chain connection settings
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub rpc_endpoint: String,
    pub poll_interval_secs: u64,
    /// Blocks behind the head the indexer stays to avoid shallow reorgs
    pub confirmations: u64,
}

impl ChainConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let rpc_endpoint =
            env::var("ETH_RPC_URL").map_err(|_| ConfigError::MissingEnv("ETH_RPC_URL".to_string()))?;

        let poll_interval_secs = env::var("ETH_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidConfig(format!("Invalid poll interval: {}", e)))?;

        if !(1..=300).contains(&poll_interval_secs) {
            return Err(ConfigError::InvalidConfig(
                "Poll interval must be between 1 and 300 seconds".to_string(),
            ));
        }

        let confirmations = env::var("ETH_CONFIRMATIONS")
            .unwrap_or_else(|_| "12".to_string())
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidConfig(format!("Invalid confirmations: {}", e)))?;

        info!(
            "Chain configuration loaded: endpoint={}, poll_interval={}s, confirmations={}",
            rpc_endpoint, poll_interval_secs, confirmations
        );

        Ok(ChainConfig {
            rpc_endpoint,
            poll_interval_secs,
            confirmations,
        })
    }
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub connection_string: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let connection_string = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnv("DATABASE_URL".to_string()))?;

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()
            .map_err(|e| ConfigError::InvalidConfig(format!("Invalid max_connections: {}", e)))?;

        debug!(
            "Database configuration loaded: max_connections={}",
            max_connections
        );

        Ok(DatabaseConfig {
            connection_string,
            max_connections,
        })
    }
}

/// Full service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub chain: ChainConfig,
    pub database: DatabaseConfig,
    pub backoff_base_interval_secs: u64,
    pub backoff_max_interval_secs: u64,
    /// Widest block span requested in a single eth_getLogs call
    pub max_block_range: u64,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let chain = ChainConfig::from_env()?;
        let database = DatabaseConfig::from_env()?;

        let backoff_base_interval_secs = env::var("INDEXER_BACKOFF_BASE_SECS")
            .unwrap_or_else(|_| "1".to_string())
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidConfig(format!("Invalid backoff base interval: {}", e)))?;

        let backoff_max_interval_secs = env::var("INDEXER_BACKOFF_MAX_SECS")
            .unwrap_or_else(|_| "600".to_string())
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidConfig(format!("Invalid backoff max interval: {}", e)))?;

        let max_block_range = env::var("INDEXER_MAX_BLOCK_RANGE")
            .unwrap_or_else(|_| "2000".to_string())
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidConfig(format!("Invalid max block range: {}", e)))?;

        if max_block_range == 0 {
            return Err(ConfigError::InvalidConfig(
                "Max block range must be at least 1".to_string(),
            ));
        }

        info!(
            "Service configuration loaded: backoff_base={}s, backoff_max={}s, max_block_range={}",
            backoff_base_interval_secs, backoff_max_interval_secs, max_block_range
        );

        Ok(ServiceConfig {
            chain,
            database,
            backoff_base_interval_secs,
            backoff_max_interval_secs,
            max_block_range,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test to avoid racing on process-wide env vars
    #[test]
    fn chain_config_from_env() {
        env::remove_var("ETH_RPC_URL");
        assert!(matches!(
            ChainConfig::from_env(),
            Err(ConfigError::MissingEnv(_))
        ));

        env::set_var("ETH_RPC_URL", "http://localhost:8545");
        env::remove_var("ETH_POLL_INTERVAL_SECS");
        env::remove_var("ETH_CONFIRMATIONS");

        let config = ChainConfig::from_env().expect("should load with defaults");
        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.confirmations, 12);
    }
}
