use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;

use crate::metrics::{self, INDEXER_CONSECUTIVE_FAILURES, INDEXER_LAST_SYNCED_BLOCK};
use crate::state::AppState;

pub async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    refresh_indexer_gauges(&state).await;

    let body = metrics::gather_metrics(&state.registry);
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        body,
    )
}

/// The indexer publishes progress through its cursor row, not its own
/// endpoint; mirror that row into gauges on every scrape. An unreadable
/// row keeps the previous values.
async fn refresh_indexer_gauges(state: &AppState) {
    let row: Result<Option<(i64, i32)>, sqlx::Error> = sqlx::query_as(
        "SELECT last_synced_block, consecutive_failures
         FROM indexer_state
         WHERE chain = 'ethereum'",
    )
    .fetch_optional(&state.db)
    .await;

    match row {
        Ok(Some((last_synced_block, consecutive_failures))) => {
            INDEXER_LAST_SYNCED_BLOCK.set(last_synced_block);
            INDEXER_CONSECUTIVE_FAILURES.set(consecutive_failures as i64);
        }
        Ok(None) => {}
        Err(err) => {
            tracing::debug!(error = ?err, "indexer state unavailable for metrics scrape");
        }
    }
}
