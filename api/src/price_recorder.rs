use adapters::PriceFeedClient;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::metrics::{PRICE_FEED_ERRORS, PRICE_FEED_REQUESTS, PRICE_POINTS_RECORDED};

const DEFAULT_RECORD_INTERVAL_SECS: u64 = 300;
const RETENTION_DAYS: i32 = 90;

/// Spawn the background price recorder.
///
/// On each tick it fetches live quotes for every token with a feed id and
/// upserts one price point per token, truncated to the minute so reruns
/// within the same minute overwrite rather than duplicate. Rows older
/// than the retention horizon are deleted on every pass.
pub fn spawn_price_recorder(pool: PgPool, price_feed: Arc<PriceFeedClient>) {
    let interval_secs = std::env::var("PRICE_RECORD_INTERVAL_SECS")
        .ok()
        .and_then(|raw| raw.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_RECORD_INTERVAL_SECS);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

        loop {
            interval.tick().await;

            if let Err(err) = record_prices(&pool, &price_feed).await {
                tracing::error!(error = ?err, "price recorder: run failed");
            }

            if let Err(err) = cleanup_old_points(&pool).await {
                tracing::error!(error = ?err, "price recorder: retention cleanup failed");
            }
        }
    });
}

async fn record_prices(pool: &PgPool, price_feed: &PriceFeedClient) -> anyhow::Result<()> {
    let tokens: Vec<(Uuid, String)> = sqlx::query_as(
        "SELECT id, price_feed_id FROM tokens WHERE price_feed_id IS NOT NULL",
    )
    .fetch_all(pool)
    .await?;

    if tokens.is_empty() {
        return Ok(());
    }

    let feed_ids: Vec<String> = tokens.iter().map(|(_, id)| id.clone()).collect();

    PRICE_FEED_REQUESTS.inc();
    let quotes = match price_feed.quotes(&feed_ids).await {
        Ok(quotes) => quotes,
        Err(err) => {
            PRICE_FEED_ERRORS.inc();
            tracing::warn!(error = %err, "price recorder: feed unavailable, skipping tick");
            return Ok(());
        }
    };

    let mut recorded = 0u64;
    for (token_id, feed_id) in &tokens {
        let Some(quote) = quotes.get(feed_id) else {
            continue;
        };
        let Some(price) = Decimal::from_f64_retain(quote.price_usd) else {
            continue;
        };
        let change = quote.change_24h.and_then(Decimal::from_f64_retain);

        sqlx::query(
            "INSERT INTO price_history (token_id, price_usd, change_24h, recorded_at)
             VALUES ($1, $2, $3, date_trunc('minute', NOW()))
             ON CONFLICT (token_id, recorded_at)
             DO UPDATE SET price_usd = EXCLUDED.price_usd, change_24h = EXCLUDED.change_24h",
        )
        .bind(token_id)
        .bind(price)
        .bind(change)
        .execute(pool)
        .await?;

        PRICE_POINTS_RECORDED.inc();
        recorded += 1;
    }

    tracing::debug!(recorded, "price recorder: tick complete");
    Ok(())
}

async fn cleanup_old_points(pool: &PgPool) -> anyhow::Result<()> {
    let deleted = sqlx::query(
        "DELETE FROM price_history WHERE recorded_at < NOW() - ($1 || ' days')::interval",
    )
    .bind(RETENTION_DAYS.to_string())
    .execute(pool)
    .await?
    .rows_affected();

    if deleted > 0 {
        tracing::info!(deleted, "price recorder: old price points removed");
    }
    Ok(())
}
