/// Resume-cursor persistence. One row per chain in `indexer_state`,
/// tracking the last block whose transfers were written.

use sqlx::{PgPool, Row};
use thiserror::Error;
use tracing::{debug, error};

pub const CHAIN_ETHEREUM: &str = "ethereum";

#[derive(Error, Debug)]
pub enum StateError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[derive(Debug, Clone)]
pub struct SyncState {
    pub chain: String,
    pub last_synced_block: u64,
    pub consecutive_failures: i32,
}

impl SyncState {
    pub fn initial(chain: &str) -> Self {
        SyncState {
            chain: chain.to_string(),
            last_synced_block: 0,
            consecutive_failures: 0,
        }
    }

    pub fn next_block_to_process(&self) -> u64 {
        self.last_synced_block + 1
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    pub fn clear_failures(&mut self) {
        self.consecutive_failures = 0;
    }
}

pub struct StateManager {
    pool: PgPool,
}

impl StateManager {
    pub fn new(pool: PgPool) -> Self {
        StateManager { pool }
    }

    /// Load the cursor for a chain, creating a zeroed row if none exists
    pub async fn load_state(&self, chain: &str) -> Result<SyncState, StateError> {
        debug!("Loading indexer state for chain: {}", chain);

        let row = sqlx::query(
            "SELECT chain, last_synced_block, consecutive_failures
             FROM indexer_state WHERE chain = $1",
        )
        .bind(chain)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StateError::DatabaseError(e.to_string()))?;

        match row {
            Some(row) => Ok(SyncState {
                chain: chain.to_string(),
                last_synced_block: row.try_get::<i64, _>("last_synced_block").unwrap_or(0).max(0)
                    as u64,
                consecutive_failures: row.try_get::<i32, _>("consecutive_failures").unwrap_or(0),
            }),
            None => {
                sqlx::query(
                    "INSERT INTO indexer_state (chain) VALUES ($1) ON CONFLICT (chain) DO NOTHING",
                )
                .bind(chain)
                .execute(&self.pool)
                .await
                .map_err(|e| StateError::DatabaseError(e.to_string()))?;
                Ok(SyncState::initial(chain))
            }
        }
    }

    pub async fn update_state(&self, state: &SyncState) -> Result<(), StateError> {
        debug!(
            "Updating indexer state: chain={}, block={}",
            state.chain, state.last_synced_block
        );

        sqlx::query(
            "UPDATE indexer_state
             SET last_synced_block = $1,
                 consecutive_failures = $2,
                 last_error = NULL,
                 updated_at = NOW()
             WHERE chain = $3",
        )
        .bind(state.last_synced_block as i64)
        .bind(state.consecutive_failures)
        .bind(&state.chain)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to update indexer state: {}", e);
            StateError::DatabaseError(e.to_string())
        })?;

        Ok(())
    }

    pub async fn record_error(&self, chain: &str, error_message: &str) -> Result<(), StateError> {
        sqlx::query(
            "UPDATE indexer_state
             SET last_error = $1,
                 consecutive_failures = consecutive_failures + 1,
                 updated_at = NOW()
             WHERE chain = $2",
        )
        .bind(error_message)
        .bind(chain)
        .execute(&self.pool)
        .await
        .map_err(|e| StateError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_block_advances_past_cursor() {
        let state = SyncState {
            chain: CHAIN_ETHEREUM.to_string(),
            last_synced_block: 100,
            consecutive_failures: 0,
        };
        assert_eq!(state.next_block_to_process(), 101);
    }

    #[test]
    fn failure_bookkeeping() {
        let mut state = SyncState::initial(CHAIN_ETHEREUM);

        state.record_failure();
        state.record_failure();
        assert_eq!(state.consecutive_failures, 2);

        state.clear_failures();
        assert_eq!(state.consecutive_failures, 0);
    }
}
