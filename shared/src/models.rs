use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Dashboard account owning one or more wallets
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A tracked Ethereum wallet
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub address: String,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A token in the registry. ETH is the native coin (`contract_address` is
/// NULL, `is_native` is true); OEC and ELOQ are ERC-20 contracts.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Token {
    pub id: Uuid,
    pub symbol: String,
    pub name: String,
    pub contract_address: Option<String>,
    pub decimals: i32,
    /// Identifier used when querying the external price feed
    pub price_feed_id: Option<String>,
    pub is_native: bool,
    pub created_at: DateTime<Utc>,
}

/// Cached wallet balance, one row per wallet × token.
/// The balance is stored pre-scaled to the token's display denomination.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Balance {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub token_id: Uuid,
    pub balance: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// A staking position recorded against a wallet
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StakingPosition {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub token_id: Uuid,
    pub pool_name: String,
    pub amount_staked: Decimal,
    pub rewards_earned: Decimal,
    pub apy: Option<Decimal>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Direction of a transfer relative to the tracked wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tx_direction", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TxDirection {
    In,
    Out,
}

impl std::fmt::Display for TxDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxDirection::In => write!(f, "in"),
            TxDirection::Out => write!(f, "out"),
        }
    }
}

/// A synced on-chain transfer. `log_index` is -1 for native-coin transfers;
/// together with `wallet_id` and `tx_hash` it forms the dedup key for the
/// indexer, so a transfer between two tracked wallets keeps one row each.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub token_id: Uuid,
    pub tx_hash: String,
    pub log_index: i64,
    pub direction: TxDirection,
    pub amount: Decimal,
    pub counterparty: Option<String>,
    pub block_number: i64,
    pub occurred_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One recorded price observation, unique per token × timestamp
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PricePoint {
    pub id: Uuid,
    pub token_id: Uuid,
    pub price_usd: Decimal,
    pub change_24h: Option<Decimal>,
    pub recorded_at: DateTime<Utc>,
}

/// Latest portfolio summary per wallet. This is a cache, overwritten on
/// every portfolio computation; history is not retained here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PortfolioSnapshot {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub net_worth: Decimal,
    pub health_score: String,
    pub token_count: i32,
    pub computed_at: DateTime<Utc>,
}

/// Live quote for one token, as returned by GET /api/prices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPriceResponse {
    pub symbol: String,
    pub price_usd: f64,
    pub change_24h: Option<f64>,
}

/// One wallet balance joined with its token metadata
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BalanceEntry {
    pub symbol: String,
    pub token_name: String,
    pub contract_address: Option<String>,
    pub decimals: i32,
    pub balance: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Response body for GET /api/wallets/:id/balances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletBalancesResponse {
    pub wallet_id: Uuid,
    pub address: String,
    pub refreshed: bool,
    pub balances: Vec<BalanceEntry>,
}

/// Portfolio payload consumed by the dashboard UI. Field names follow the
/// frontend contract, hence camelCase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioResponse {
    pub wallet_id: Uuid,
    pub net_worth: Decimal,
    pub total_value: Decimal,
    pub health_score: String,
    pub tokens: Vec<crate::portfolio::TokenValuation>,
    pub timestamp: DateTime<Utc>,
}

/// Standard pagination envelope for list endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: i64, page: i64, limit: i64) -> Self {
        let total_pages = if limit > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };
        Self {
            data,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_rounds_up() {
        let page: PaginatedResponse<i32> = PaginatedResponse::new(vec![], 41, 1, 20);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn pagination_exact_multiple() {
        let page: PaginatedResponse<i32> = PaginatedResponse::new(vec![], 40, 2, 20);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn direction_labels() {
        assert_eq!(TxDirection::In.to_string(), "in");
        assert_eq!(TxDirection::Out.to_string(), "out");
    }
}
