use adapters::{EthRpcClient, PriceFeedClient};
use prometheus::Registry;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers.
///
/// Adapters are constructed once in `main` and injected here rather than
/// reached through globals, so tests and alternate deployments can
/// substitute their own instances.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub started_at: Instant,
    pub price_feed: Arc<PriceFeedClient>,
    pub chain: Arc<EthRpcClient>,
    pub registry: Registry,
}

impl AppState {
    pub fn new(
        db: PgPool,
        price_feed: Arc<PriceFeedClient>,
        chain: Arc<EthRpcClient>,
        registry: Registry,
    ) -> Self {
        Self {
            db,
            started_at: Instant::now(),
            price_feed,
            chain,
            registry,
        }
    }
}
