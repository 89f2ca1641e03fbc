use once_cell::sync::Lazy;
use prometheus::{
    opts, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Registry,
    TextEncoder,
};

macro_rules! counter_vec {
    ($name:expr, $help:expr, $labels:expr) => {
        Lazy::new(|| IntCounterVec::new(opts!($name, $help), $labels).unwrap())
    };
}
macro_rules! counter {
    ($name:expr, $help:expr) => {
        Lazy::new(|| IntCounter::new($name, $help).unwrap())
    };
}
macro_rules! gauge {
    ($name:expr, $help:expr) => {
        Lazy::new(|| IntGauge::new($name, $help).unwrap())
    };
}

const LATENCY_BUCKETS: [f64; 11] = [
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

// ── HTTP ────────────────────────────────────────────────────────────────────
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> =
    counter_vec!("http_requests_total", "Total HTTP requests", &["method", "status"]);
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("http_request_duration_seconds", "HTTP request latency")
            .buckets(LATENCY_BUCKETS.to_vec()),
        &["method"],
    )
    .unwrap()
});
pub static HTTP_IN_FLIGHT: Lazy<IntGauge> =
    gauge!("http_requests_in_flight", "In-flight HTTP requests");

// ── Database ────────────────────────────────────────────────────────────────
pub static DB_QUERY_ERRORS: Lazy<IntCounter> = counter!("db_query_errors_total", "DB query errors");

// ── Portfolio ───────────────────────────────────────────────────────────────
pub static PORTFOLIO_COMPUTATIONS: Lazy<IntCounter> =
    counter!("portfolio_computations_total", "Portfolio metric computations");
pub static BALANCE_REFRESHES: Lazy<IntCounter> =
    counter!("balance_refreshes_total", "On-chain balance refreshes");
pub static BALANCE_REFRESH_ERRORS: Lazy<IntCounter> =
    counter!("balance_refresh_errors_total", "Failed on-chain balance reads");

// ── Price feed ──────────────────────────────────────────────────────────────
pub static PRICE_FEED_REQUESTS: Lazy<IntCounter> =
    counter!("price_feed_requests_total", "Price feed lookups");
pub static PRICE_FEED_ERRORS: Lazy<IntCounter> =
    counter!("price_feed_errors_total", "Failed price feed lookups");
pub static PRICE_POINTS_RECORDED: Lazy<IntCounter> =
    counter!("price_points_recorded_total", "Price history rows upserted");

// ── Indexer ─────────────────────────────────────────────────────────────────
// Progress of the transfer indexer, read from its cursor table at scrape
// time. The worker has no HTTP surface of its own.
pub static INDEXER_LAST_SYNCED_BLOCK: Lazy<IntGauge> = gauge!(
    "indexer_last_synced_block",
    "Last block synced by the transfer indexer"
);
pub static INDEXER_CONSECUTIVE_FAILURES: Lazy<IntGauge> = gauge!(
    "indexer_consecutive_failures",
    "Consecutive failed indexer sync cycles"
);

pub fn register_all(r: &Registry) -> prometheus::Result<()> {
    r.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    r.register(Box::new(HTTP_REQUEST_DURATION.clone()))?;
    r.register(Box::new(HTTP_IN_FLIGHT.clone()))?;
    r.register(Box::new(DB_QUERY_ERRORS.clone()))?;
    r.register(Box::new(PORTFOLIO_COMPUTATIONS.clone()))?;
    r.register(Box::new(BALANCE_REFRESHES.clone()))?;
    r.register(Box::new(BALANCE_REFRESH_ERRORS.clone()))?;
    r.register(Box::new(PRICE_FEED_REQUESTS.clone()))?;
    r.register(Box::new(PRICE_FEED_ERRORS.clone()))?;
    r.register(Box::new(PRICE_POINTS_RECORDED.clone()))?;
    r.register(Box::new(INDEXER_LAST_SYNCED_BLOCK.clone()))?;
    r.register(Box::new(INDEXER_CONSECUTIVE_FAILURES.clone()))?;
    Ok(())
}

pub fn observe_http(method: &str, status: u16, elapsed_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[method])
        .observe(elapsed_secs);
}

pub fn gather_metrics(registry: &Registry) -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&registry.gather(), &mut buffer) {
        tracing::error!(error = ?err, "failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_gathers_all_families() {
        let registry = Registry::new_custom(Some("test".into()), None).unwrap();
        register_all(&registry).unwrap();
        assert!(registry.gather().len() >= 10);
    }

    #[test]
    fn indexer_gauges_surface_in_exposition() {
        let registry = Registry::new_custom(Some("test".into()), None).unwrap();
        register_all(&registry).unwrap();

        INDEXER_LAST_SYNCED_BLOCK.set(19_123_456);
        INDEXER_CONSECUTIVE_FAILURES.set(2);

        let body = gather_metrics(&registry);
        assert!(body.contains("test_indexer_last_synced_block 19123456"));
        assert!(body.contains("test_indexer_consecutive_failures 2"));
    }

    #[test]
    fn observe_http_increments_counters() {
        let before = HTTP_REQUESTS_TOTAL.with_label_values(&["GET", "200"]).get();
        observe_http("GET", 200, 0.002);
        let after = HTTP_REQUESTS_TOTAL.with_label_values(&["GET", "200"]).get();
        assert_eq!(after, before + 1);
    }
}
