use axum::{
    extract::{Path, State},
    Json,
};
use shared::{classify_health, compute_metrics, PortfolioResponse, TokenHolding};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::handlers::db_internal_error;
use crate::metrics::{PORTFOLIO_COMPUTATIONS, PRICE_FEED_ERRORS, PRICE_FEED_REQUESTS};
use crate::state::AppState;
use crate::wallet_handlers::fetch_wallet;

#[derive(Debug, FromRow)]
struct HoldingRow {
    symbol: String,
    contract_address: Option<String>,
    decimals: i32,
    price_feed_id: Option<String>,
    balance: rust_decimal::Decimal,
}

/// Aggregate a wallet's holdings into net worth, allocation percentages,
/// and a health score, and cache the summary as a snapshot.
///
/// A price feed outage degrades to zero prices so the endpoint still
/// answers; the resulting "No Holdings" score is an accepted artifact of
/// the outage.
pub async fn get_wallet_portfolio(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PortfolioResponse>> {
    let wallet = fetch_wallet(&state, id).await?;

    let rows = sqlx::query_as::<_, HoldingRow>(
        "SELECT t.symbol, t.contract_address, t.decimals, t.price_feed_id, b.balance
         FROM balances b
         JOIN tokens t ON t.id = b.token_id
         WHERE b.wallet_id = $1
         ORDER BY t.symbol ASC",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await
    .map_err(|err| db_internal_error("list portfolio holdings", err))?;

    let feed_ids: Vec<String> = rows
        .iter()
        .filter_map(|r| r.price_feed_id.clone())
        .collect();

    PRICE_FEED_REQUESTS.inc();
    let quotes = match state.price_feed.quotes(&feed_ids).await {
        Ok(quotes) => quotes,
        Err(err) => {
            PRICE_FEED_ERRORS.inc();
            tracing::warn!(wallet_id = %id, error = %err, "price feed lookup failed, valuing at zero");
            Default::default()
        }
    };

    let holdings: Vec<TokenHolding> = rows
        .iter()
        .map(|row| {
            let price_usd = row
                .price_feed_id
                .as_deref()
                .and_then(|feed_id| quotes.get(feed_id))
                .map(|q| q.price_usd)
                .unwrap_or(0.0);
            TokenHolding {
                token_address: row
                    .contract_address
                    .clone()
                    .unwrap_or_else(|| row.symbol.clone()),
                balance: row.balance.to_string(),
                decimals: row.decimals.max(0) as u32,
                price_usd,
            }
        })
        .collect();

    // Balances come from the store and prices from the feed, both already
    // normalized, so a computation failure here is a server fault.
    let metrics = compute_metrics(&holdings)
        .map_err(|err| {
            tracing::error!(wallet_id = %id, error = %err, "portfolio computation rejected stored data");
            ApiError::internal("Portfolio computation failed")
        })?;
    let health = classify_health(&metrics);
    PORTFOLIO_COMPUTATIONS.inc();

    sqlx::query(
        "INSERT INTO portfolio_snapshots (wallet_id, net_worth, health_score, token_count, computed_at)
         VALUES ($1, $2, $3, $4, NOW())
         ON CONFLICT (wallet_id)
         DO UPDATE SET net_worth = EXCLUDED.net_worth,
                       health_score = EXCLUDED.health_score,
                       token_count = EXCLUDED.token_count,
                       computed_at = NOW()",
    )
    .bind(wallet.id)
    .bind(metrics.net_worth)
    .bind(health.as_str())
    .bind(metrics.tokens.len() as i32)
    .execute(&state.db)
    .await
    .map_err(|err| db_internal_error("upsert portfolio snapshot", err))?;

    Ok(Json(PortfolioResponse {
        wallet_id: wallet.id,
        net_worth: metrics.net_worth,
        total_value: metrics.total_value,
        health_score: health.as_str().to_string(),
        tokens: metrics.tokens,
        timestamp: chrono::Utc::now(),
    }))
}
