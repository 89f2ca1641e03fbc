/// Ethereum Transfer Indexer Service
/// Continuously syncs ERC-20 Transfer events for tracked wallets into the
/// dashboard database.
///
/// This service:
/// - Polls the Ethereum RPC endpoint on 30-second intervals (configurable)
/// - Stays a configurable number of confirmations behind the chain head
/// - Fetches Transfer logs per wallet x token via eth_getLogs
/// - Resolves block timestamps and writes deduplicated transaction rows
/// - Tracks the last synced block for safe resume after restarts
/// - Handles RPC failures with exponential backoff

use adapters::EthRpcClient;
use anyhow::Result;
use chrono::{DateTime, Utc};
use indexer::backoff::ExponentialBackoff;
use indexer::config::ServiceConfig;
use indexer::db::DatabaseWriter;
use indexer::state::{StateManager, SyncState, CHAIN_ETHEREUM};
use indexer::transfers;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

struct IndexerService {
    config: ServiceConfig,
    rpc_client: EthRpcClient,
    db_writer: DatabaseWriter,
    state_manager: StateManager,
    backoff: ExponentialBackoff,
}

impl IndexerService {
    async fn new(config: ServiceConfig) -> Result<Self> {
        let db_pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database.connection_string)
            .await?;

        let rpc_client = EthRpcClient::new(config.chain.rpc_endpoint.clone());
        let db_writer = DatabaseWriter::new(db_pool.clone());
        let state_manager = StateManager::new(db_pool);
        let backoff = ExponentialBackoff::new(
            config.backoff_base_interval_secs,
            config.backoff_max_interval_secs,
        );

        Ok(IndexerService {
            config,
            rpc_client,
            db_writer,
            state_manager,
            backoff,
        })
    }

    async fn run(&mut self) -> Result<()> {
        info!("Starting Ethereum transfer indexer");

        let mut state = match self.state_manager.load_state(CHAIN_ETHEREUM).await {
            Ok(s) => {
                info!("Loaded indexer state: last_synced_block={}", s.last_synced_block);
                s
            }
            Err(e) => {
                error!("Failed to load indexer state: {}, starting from zero", e);
                SyncState::initial(CHAIN_ETHEREUM)
            }
        };

        loop {
            let poll_duration = Duration::from_secs(self.config.chain.poll_interval_secs);

            match self.poll_and_sync(&mut state).await {
                Ok(_) => {
                    self.backoff.on_success();
                }
                Err(e) => {
                    error!("Error during sync cycle: {}", e);
                    state.record_failure();

                    let backoff_duration = self.backoff.on_failure(&e.to_string());
                    let _ = self
                        .state_manager
                        .record_error(CHAIN_ETHEREUM, &e.to_string())
                        .await;

                    warn!(
                        attempt = self.backoff.attempts(),
                        backoff_secs = backoff_duration.as_secs(),
                        "Backing off before retry"
                    );

                    tokio::time::sleep(backoff_duration).await;
                    continue;
                }
            }

            tokio::time::sleep(poll_duration).await;
        }
    }

    /// Single sync cycle: pick the next block window behind the confirmed
    /// head and write every tracked wallet's transfers in it.
    async fn poll_and_sync(&mut self, state: &mut SyncState) -> Result<()> {
        let latest_block = self.rpc_client.latest_block().await?;
        let safe_head = latest_block.saturating_sub(self.config.chain.confirmations);
        let from_block = state.next_block_to_process();

        if from_block > safe_head {
            info!(
                latest_block,
                safe_head, "No confirmed blocks to process yet"
            );
            return Ok(());
        }

        let to_block = safe_head.min(from_block + self.config.max_block_range - 1);

        info!(
            latest_block,
            from_block,
            to_block,
            lag = safe_head.saturating_sub(from_block),
            "Sync cycle started"
        );

        let wallets = self.db_writer.tracked_wallets().await?;
        let tokens = self.db_writer.erc20_tokens().await?;

        if wallets.is_empty() || tokens.is_empty() {
            state.last_synced_block = to_block;
            state.clear_failures();
            self.state_manager.update_state(state).await?;
            return Ok(());
        }

        let mut batch = Vec::new();
        let mut timestamps: HashMap<u64, Option<DateTime<Utc>>> = HashMap::new();

        for wallet in &wallets {
            for token in &tokens {
                let logs = self
                    .rpc_client
                    .transfer_logs(&token.contract_address, &wallet.address, from_block, to_block)
                    .await?;

                for log in &logs {
                    let occurred_at = match timestamps.get(&log.block_number) {
                        Some(cached) => *cached,
                        None => {
                            let resolved = self.resolve_timestamp(log.block_number).await;
                            timestamps.insert(log.block_number, resolved);
                            resolved
                        }
                    };

                    if let Some(transfer) = transfers::decode_transfer(
                        log,
                        wallet.id,
                        &wallet.address,
                        token.id,
                        token.decimals.max(0) as u32,
                        occurred_at,
                    )? {
                        batch.push(transfer);
                    }
                }
            }
        }

        let (new_count, duplicate_count) = self.db_writer.write_transfers_batch(&batch).await?;

        state.last_synced_block = to_block;
        state.clear_failures();
        self.state_manager.update_state(state).await?;

        info!(
            from_block,
            to_block,
            new = new_count,
            duplicates = duplicate_count,
            "Sync cycle completed"
        );

        Ok(())
    }

    /// A missing timestamp is not fatal; the row is written without one
    async fn resolve_timestamp(&self, block: u64) -> Option<DateTime<Utc>> {
        match self.rpc_client.block_timestamp(block).await {
            Ok(secs) => DateTime::from_timestamp(secs as i64, 0),
            Err(e) => {
                warn!(block, error = %e, "Failed to resolve block timestamp");
                None
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "indexer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .init();

    info!("Ethereum Transfer Indexer starting...");

    let config = ServiceConfig::from_env()?;
    let mut service = IndexerService::new(config).await?;

    let shutdown_signal = signal_support::create_shutdown_signal();

    tokio::select! {
        result = service.run() => {
            match result {
                Ok(_) => {
                    info!("Indexer service completed normally");
                    Ok(())
                }
                Err(e) => {
                    error!("Indexer service encountered fatal error: {}", e);
                    Err(e)
                }
            }
        }
        _ = shutdown_signal => {
            info!("Received shutdown signal, gracefully exiting...");
            Ok(())
        }
    }
}

/// Signal handling support
mod signal_support {
    use std::future::Future;

    pub fn create_shutdown_signal() -> impl Future<Output = ()> {
        async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};

                let mut sigterm =
                    signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
                let mut sigint =
                    signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");

                tokio::select! {
                    _ = sigterm.recv() => {
                        tracing::info!("Received SIGTERM");
                    }
                    _ = sigint.recv() => {
                        tracing::info!("Received SIGINT");
                    }
                }
            }

            #[cfg(windows)]
            {
                tokio::signal::ctrl_c()
                    .await
                    .expect("Failed to listen for Ctrl+C");
                tracing::info!("Received Ctrl+C");
            }
        }
    }
}
