use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use shared::{PricePoint, Token, TokenPriceResponse};

use crate::error::{ApiError, ApiResult};
use crate::handlers::db_internal_error;
use crate::metrics::{PRICE_FEED_ERRORS, PRICE_FEED_REQUESTS};
use crate::state::AppState;

pub async fn list_tokens(State(state): State<AppState>) -> ApiResult<Json<Vec<Token>>> {
    let tokens = sqlx::query_as::<_, Token>("SELECT * FROM tokens ORDER BY symbol ASC")
        .fetch_all(&state.db)
        .await
        .map_err(|err| db_internal_error("list tokens", err))?;

    Ok(Json(tokens))
}

pub async fn get_token(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult<Json<Token>> {
    let symbol = symbol.trim().to_uppercase();
    let token = sqlx::query_as::<_, Token>("SELECT * FROM tokens WHERE symbol = $1")
        .bind(&symbol)
        .fetch_optional(&state.db)
        .await
        .map_err(|err| db_internal_error("fetch token", err))?
        .ok_or_else(|| ApiError::token_not_found(&symbol))?;

    Ok(Json(token))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub hours: Option<i64>,
}

/// Recorded price history for a token, newest first.
/// `hours` defaults to 24 and is clamped to at most 30 days.
pub async fn get_token_history(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<PricePoint>>> {
    let symbol = symbol.trim().to_uppercase();
    let hours = query.hours.unwrap_or(24).clamp(1, 720);

    let token_id: Option<uuid::Uuid> = sqlx::query_scalar("SELECT id FROM tokens WHERE symbol = $1")
        .bind(&symbol)
        .fetch_optional(&state.db)
        .await
        .map_err(|err| db_internal_error("fetch token id", err))?;
    let token_id = token_id.ok_or_else(|| ApiError::token_not_found(&symbol))?;

    let points = sqlx::query_as::<_, PricePoint>(
        "SELECT * FROM price_history
         WHERE token_id = $1 AND recorded_at >= NOW() - ($2 || ' hours')::interval
         ORDER BY recorded_at DESC",
    )
    .bind(token_id)
    .bind(hours.to_string())
    .fetch_all(&state.db)
    .await
    .map_err(|err| db_internal_error("list price history", err))?;

    Ok(Json(points))
}

/// Live USD quotes for every registered token.
///
/// Tokens the feed does not know come back with a zero price rather than
/// being omitted, so the dashboard always renders the full token list.
pub async fn get_prices(State(state): State<AppState>) -> ApiResult<Json<Vec<TokenPriceResponse>>> {
    let tokens = sqlx::query_as::<_, Token>("SELECT * FROM tokens ORDER BY symbol ASC")
        .fetch_all(&state.db)
        .await
        .map_err(|err| db_internal_error("list tokens", err))?;

    let feed_ids: Vec<String> = tokens
        .iter()
        .filter_map(|t| t.price_feed_id.clone())
        .collect();

    PRICE_FEED_REQUESTS.inc();
    let quotes = match state.price_feed.quotes(&feed_ids).await {
        Ok(quotes) => quotes,
        Err(err) => {
            PRICE_FEED_ERRORS.inc();
            tracing::warn!(error = %err, "price feed lookup failed, serving zero prices");
            Default::default()
        }
    };

    let prices = tokens
        .into_iter()
        .map(|token| {
            let quote = token
                .price_feed_id
                .as_deref()
                .and_then(|id| quotes.get(id));
            TokenPriceResponse {
                symbol: token.symbol,
                price_usd: quote.map(|q| q.price_usd).unwrap_or(0.0),
                change_24h: quote.and_then(|q| q.change_24h),
            }
        })
        .collect();

    Ok(Json(prices))
}
