/// Database access for the indexer: tracked wallets, the ERC-20 token
/// registry, and batched transfer writes.

use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::transfers::NewTransfer;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// A wallet the indexer watches for transfers
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrackedWallet {
    pub id: Uuid,
    pub address: String,
}

/// An ERC-20 token the indexer syncs transfer logs for
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Erc20Token {
    pub id: Uuid,
    pub symbol: String,
    pub contract_address: String,
    pub decimals: i32,
}

pub struct DatabaseWriter {
    pool: PgPool,
}

impl DatabaseWriter {
    pub fn new(pool: PgPool) -> Self {
        DatabaseWriter { pool }
    }

    pub async fn tracked_wallets(&self) -> Result<Vec<TrackedWallet>, DbError> {
        let wallets = sqlx::query_as::<_, TrackedWallet>(
            "SELECT id, address FROM wallets ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(wallets)
    }

    /// Tokens with an on-chain contract; the native coin has no Transfer logs
    pub async fn erc20_tokens(&self) -> Result<Vec<Erc20Token>, DbError> {
        let tokens = sqlx::query_as::<_, Erc20Token>(
            "SELECT id, symbol, contract_address, decimals
             FROM tokens
             WHERE contract_address IS NOT NULL AND is_native = false
             ORDER BY symbol ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tokens)
    }

    /// Insert a batch of transfers, skipping rows already present.
    ///
    /// The dedup key is `(wallet_id, tx_hash, log_index)`: a transfer
    /// between two tracked wallets legitimately produces one row per
    /// wallet, so the wallet is part of the key. Returns (new, duplicates).
    pub async fn write_transfers_batch(
        &self,
        transfers: &[NewTransfer],
    ) -> Result<(u64, u64), DbError> {
        let mut new_count = 0u64;

        for transfer in transfers {
            let inserted = sqlx::query(
                "INSERT INTO transactions
                     (wallet_id, token_id, tx_hash, log_index, direction, amount,
                      counterparty, block_number, occurred_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 ON CONFLICT (wallet_id, tx_hash, log_index) DO NOTHING",
            )
            .bind(transfer.wallet_id)
            .bind(transfer.token_id)
            .bind(&transfer.tx_hash)
            .bind(transfer.log_index)
            .bind(transfer.direction)
            .bind(transfer.amount)
            .bind(&transfer.counterparty)
            .bind(transfer.block_number)
            .bind(transfer.occurred_at)
            .execute(&self.pool)
            .await?
            .rows_affected();

            new_count += inserted;
        }

        let duplicate_count = transfers.len() as u64 - new_count;
        debug!(
            new = new_count,
            duplicates = duplicate_count,
            "transfer batch written"
        );
        Ok((new_count, duplicate_count))
    }
}
