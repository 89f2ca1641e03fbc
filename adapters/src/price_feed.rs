/// Price feed adapter
/// Fetches USD prices and 24h change for registered tokens from a
/// CoinGecko-compatible price API. Stateless request/response with a
/// short-TTL in-process cache to stay inside upstream rate limits.
use moka::future::Cache;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";
const DEFAULT_CACHE_TTL_SECS: u64 = 60;
const DEFAULT_CACHE_CAPACITY: u64 = 256;

#[derive(Error, Debug)]
pub enum PriceFeedError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),
    #[error("price API returned error: {0}")]
    ApiError(String),
    #[error("invalid response format: {0}")]
    InvalidResponse(String),
    #[error("network timeout")]
    Timeout,
}

/// USD quote for one token id
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceQuote {
    pub price_usd: f64,
    pub change_24h: Option<f64>,
}

/// Client for the external price API
pub struct PriceFeedClient {
    base_url: String,
    client: reqwest::Client,
    request_timeout: Duration,
    cache: Cache<String, PriceQuote>,
}

impl PriceFeedClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_cache_ttl(base_url, Duration::from_secs(DEFAULT_CACHE_TTL_SECS))
    }

    pub fn with_cache_ttl(base_url: impl Into<String>, ttl: Duration) -> Self {
        let client = reqwest::ClientBuilder::new()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        PriceFeedClient {
            base_url: base_url.into(),
            client,
            request_timeout: Duration::from_secs(30),
            cache: Cache::builder()
                .max_capacity(DEFAULT_CACHE_CAPACITY)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn from_env() -> Self {
        let base_url =
            std::env::var("PRICE_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    /// Fetch USD quotes for the given feed ids.
    ///
    /// Ids the upstream API does not know are simply absent from the result;
    /// callers substitute a zero price for missing entries. Cached quotes are
    /// served without touching the network.
    pub async fn quotes(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, PriceQuote>, PriceFeedError> {
        let mut resolved = HashMap::new();
        let mut missing = Vec::new();

        for id in ids {
            match self.cache.get(id).await {
                Some(quote) => {
                    resolved.insert(id.clone(), quote);
                }
                None => missing.push(id.clone()),
            }
        }

        if missing.is_empty() {
            debug!(count = resolved.len(), "price quotes served from cache");
            return Ok(resolved);
        }

        let fetched = self.fetch_quotes(&missing).await?;
        for (id, quote) in fetched {
            self.cache.insert(id.clone(), quote).await;
            resolved.insert(id, quote);
        }

        Ok(resolved)
    }

    /// Fetch a single quote; `None` when the feed does not know the id
    pub async fn quote(&self, id: &str) -> Result<Option<PriceQuote>, PriceFeedError> {
        let quotes = self.quotes(&[id.to_string()]).await?;
        Ok(quotes.get(id).copied())
    }

    async fn fetch_quotes(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, PriceQuote>, PriceFeedError> {
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd&include_24hr_change=true",
            self.base_url,
            ids.join(",")
        );
        debug!(ids = ids.len(), "fetching quotes from {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PriceFeedError::Timeout
                } else {
                    PriceFeedError::RequestFailed(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(PriceFeedError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            PriceFeedError::InvalidResponse(format!("failed to parse price response: {}", e))
        })?;

        let quotes = parse_quotes(&body)?;
        if quotes.len() < ids.len() {
            warn!(
                requested = ids.len(),
                resolved = quotes.len(),
                "price feed did not resolve every token id"
            );
        }
        Ok(quotes)
    }
}

/// Parse a `/simple/price` payload: `{"<id>": {"usd": 1.23, "usd_24h_change": -0.5}}`.
/// Entries without a numeric `usd` field are skipped.
fn parse_quotes(body: &Value) -> Result<HashMap<String, PriceQuote>, PriceFeedError> {
    let object = body.as_object().ok_or_else(|| {
        PriceFeedError::InvalidResponse("expected a JSON object keyed by token id".to_string())
    })?;

    let mut quotes = HashMap::new();
    for (id, entry) in object {
        let Some(price_usd) = entry.get("usd").and_then(Value::as_f64) else {
            warn!(id = id.as_str(), "price entry missing usd field, skipping");
            continue;
        };
        let change_24h = entry.get("usd_24h_change").and_then(Value::as_f64);
        quotes.insert(
            id.clone(),
            PriceQuote {
                price_usd,
                change_24h,
            },
        );
    }
    Ok(quotes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_standard_payload() {
        let body = json!({
            "ethereum": {"usd": 3412.18, "usd_24h_change": -1.24},
            "oeconomia": {"usd": 0.0931}
        });

        let quotes = parse_quotes(&body).unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes["ethereum"].price_usd, 3412.18);
        assert_eq!(quotes["ethereum"].change_24h, Some(-1.24));
        assert_eq!(quotes["oeconomia"].change_24h, None);
    }

    #[test]
    fn skips_entries_without_usd_price() {
        let body = json!({
            "ethereum": {"usd": 3412.18},
            "unknown-token": {}
        });

        let quotes = parse_quotes(&body).unwrap();
        assert_eq!(quotes.len(), 1);
        assert!(!quotes.contains_key("unknown-token"));
    }

    #[test]
    fn rejects_non_object_payload() {
        assert!(parse_quotes(&json!([1, 2, 3])).is_err());
    }

    #[tokio::test]
    async fn cache_serves_inserted_quotes() {
        let client = PriceFeedClient::new("http://localhost:0");
        let quote = PriceQuote {
            price_usd: 1.0,
            change_24h: None,
        };
        client.cache.insert("ethereum".to_string(), quote).await;

        // No network: the cached entry satisfies the request.
        let quotes = client.quotes(&["ethereum".to_string()]).await.unwrap();
        assert_eq!(quotes["ethereum"], quote);
    }
}
