//! Per-IP sliding-window rate limiting with three tiers: reads, writes,
//! and health probes.

use std::{
    collections::HashMap,
    env,
    net::{IpAddr, SocketAddr},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use axum::{
    body::Body,
    extract::{connect_info::ConnectInfo, State},
    http::{header::RETRY_AFTER, HeaderName, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

const DEFAULT_READ_LIMIT_PER_MINUTE: u32 = 100;
const DEFAULT_WRITE_LIMIT_PER_MINUTE: u32 = 20;
const DEFAULT_HEALTH_LIMIT_PER_MINUTE: u32 = 10_000;
const DEFAULT_WINDOW_SECONDS: u64 = 60;

const HEADER_RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const HEADER_RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const HEADER_RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Tier {
    Read,
    Write,
    Health,
}

#[derive(Clone)]
pub struct RateLimitState {
    config: Arc<RateLimitConfig>,
    buckets: Arc<Mutex<HashMap<BucketKey, BucketState>>>,
}

impl RateLimitState {
    pub fn from_env() -> Self {
        Self::new(RateLimitConfig::from_env())
    }

    fn new(config: RateLimitConfig) -> Self {
        Self {
            config: Arc::new(config),
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn check_request<B>(&self, request: &Request<B>) -> RateLimitDecision {
        let tier = classify_tier(request.method(), request.uri().path());
        let limit = self.config.limit_for(tier);
        let key = BucketKey {
            ip: extract_client_ip(request),
            tier,
        };
        let now = Instant::now();

        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");
        let bucket = buckets.entry(key).or_insert_with(|| BucketState {
            window_start: now,
            count: 0,
        });

        if now.duration_since(bucket.window_start) >= self.config.window {
            bucket.window_start = now;
            bucket.count = 0;
        }

        let remaining_window = self
            .config
            .window
            .saturating_sub(now.duration_since(bucket.window_start));
        let reset_seconds = ceil_duration_to_seconds(remaining_window).max(1);

        if bucket.count >= limit {
            return RateLimitDecision {
                allowed: false,
                limit,
                remaining: 0,
                reset_seconds,
            };
        }

        bucket.count += 1;
        RateLimitDecision {
            allowed: true,
            limit,
            remaining: limit.saturating_sub(bucket.count),
            reset_seconds,
        }
    }
}

struct RateLimitConfig {
    read_limit: u32,
    write_limit: u32,
    health_limit: u32,
    window: Duration,
}

impl RateLimitConfig {
    fn from_env() -> Self {
        let read_limit = env_u32("RATE_LIMIT_READ_PER_MINUTE", DEFAULT_READ_LIMIT_PER_MINUTE);
        let write_limit = env_u32(
            "RATE_LIMIT_WRITE_PER_MINUTE",
            DEFAULT_WRITE_LIMIT_PER_MINUTE,
        );
        let health_limit = env_u32(
            "RATE_LIMIT_HEALTH_PER_MINUTE",
            DEFAULT_HEALTH_LIMIT_PER_MINUTE,
        );
        let window_seconds = env_u64("RATE_LIMIT_WINDOW_SECONDS", DEFAULT_WINDOW_SECONDS).max(1);

        tracing::info!(
            read_limit,
            write_limit,
            health_limit,
            window_seconds,
            "rate limiter configured"
        );

        Self {
            read_limit,
            write_limit,
            health_limit,
            window: Duration::from_secs(window_seconds),
        }
    }

    fn limit_for(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Read => self.read_limit,
            Tier::Write => self.write_limit,
            Tier::Health => self.health_limit,
        }
    }

    #[cfg(test)]
    fn for_tests(read_limit: u32, write_limit: u32, health_limit: u32, window: Duration) -> Self {
        Self {
            read_limit,
            write_limit,
            health_limit,
            window,
        }
    }
}

#[derive(Hash, Eq, PartialEq)]
struct BucketKey {
    ip: String,
    tier: Tier,
}

struct BucketState {
    window_start: Instant,
    count: u32,
}

struct RateLimitDecision {
    allowed: bool,
    limit: u32,
    remaining: u32,
    reset_seconds: u64,
}

pub async fn rate_limit_middleware(
    State(rate_limiter): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let decision = rate_limiter.check_request(&request);

    if !decision.allowed {
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "rate limit exceeded" })),
        )
            .into_response();
        attach_rate_limit_headers(&mut response, &decision);
        response.headers_mut().insert(
            RETRY_AFTER,
            HeaderValue::from_str(&decision.reset_seconds.to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("1")),
        );
        return response;
    }

    let mut response = next.run(request).await;
    attach_rate_limit_headers(&mut response, &decision);
    response
}

fn attach_rate_limit_headers(response: &mut Response, decision: &RateLimitDecision) {
    response.headers_mut().insert(
        HEADER_RATE_LIMIT_LIMIT,
        HeaderValue::from_str(&decision.limit.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    response.headers_mut().insert(
        HEADER_RATE_LIMIT_REMAINING,
        HeaderValue::from_str(&decision.remaining.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    response.headers_mut().insert(
        HEADER_RATE_LIMIT_RESET,
        HeaderValue::from_str(&decision.reset_seconds.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("1")),
    );
}

fn classify_tier(method: &Method, path: &str) -> Tier {
    if path == "/health" || path == "/metrics" || *method == Method::OPTIONS {
        return Tier::Health;
    }
    if matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    ) {
        return Tier::Write;
    }
    Tier::Read
}

fn extract_client_ip<B>(request: &Request<B>) -> String {
    if let Some(ip) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(parse_x_forwarded_for)
    {
        return ip.to_string();
    }

    if let Some(ip) = request
        .headers()
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .and_then(parse_ip_addr)
    {
        return ip.to_string();
    }

    if let Some(connect_info) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return connect_info.0.ip().to_string();
    }

    "unknown".to_string()
}

fn parse_x_forwarded_for(raw: &str) -> Option<IpAddr> {
    raw.split(',').map(str::trim).find_map(parse_ip_addr)
}

fn parse_ip_addr(raw: &str) -> Option<IpAddr> {
    raw.parse::<IpAddr>()
        .ok()
        .or_else(|| raw.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}

fn env_u32(key: &str, default: u32) -> u32 {
    match env::var(key) {
        Ok(raw) => match raw.parse::<u32>() {
            Ok(value) if value > 0 => value,
            _ => {
                tracing::warn!("invalid value for {key} (`{raw}`), using default {default}");
                default
            }
        },
        Err(_) => default,
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(value) if value > 0 => value,
            _ => {
                tracing::warn!("invalid value for {key} (`{raw}`), using default {default}");
                default
            }
        },
        Err(_) => default,
    }
}

fn ceil_duration_to_seconds(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::Request,
        middleware,
        routing::{get, post},
        Router,
    };
    use tower::Service;

    fn test_app(read_limit: u32, write_limit: u32, health_limit: u32) -> Router<()> {
        let limiter = RateLimitState::new(RateLimitConfig::for_tests(
            read_limit,
            write_limit,
            health_limit,
            Duration::from_secs(60),
        ));

        Router::new()
            .route("/health", get(|| async { "ok" }))
            .route("/api/tokens", get(|| async { "tokens" }))
            .route("/api/wallets", post(|| async { "created" }))
            .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
    }

    async fn call(app: &Router<()>, method: &str, uri: &str, ip: &str) -> Response {
        let mut svc = app.clone();
        svc.call(
            Request::builder()
                .uri(uri)
                .method(method)
                .header("x-forwarded-for", ip)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn read_limit_trips_after_budget_is_spent() {
        let app = test_app(3, 1, 10_000);

        for _ in 0..3 {
            let response = call(&app, "GET", "/api/tokens", "203.0.113.10").await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let limited = call(&app, "GET", "/api/tokens", "203.0.113.10").await;
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(limited.headers().contains_key(RETRY_AFTER));
    }

    #[tokio::test]
    async fn rate_limit_headers_present_on_success_and_429() {
        let app = test_app(1, 1, 10_000);

        let ok = call(&app, "GET", "/api/tokens", "198.51.100.22").await;
        assert_eq!(ok.status(), StatusCode::OK);
        assert!(ok.headers().contains_key(HEADER_RATE_LIMIT_LIMIT));
        assert!(ok.headers().contains_key(HEADER_RATE_LIMIT_REMAINING));
        assert!(ok.headers().contains_key(HEADER_RATE_LIMIT_RESET));

        let limited = call(&app, "GET", "/api/tokens", "198.51.100.22").await;
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(limited.headers().contains_key(HEADER_RATE_LIMIT_LIMIT));
    }

    #[tokio::test]
    async fn writes_and_reads_draw_from_separate_buckets() {
        let app = test_app(3, 1, 10_000);
        let ip = "203.0.113.33";

        let write_ok = call(&app, "POST", "/api/wallets", ip).await;
        assert_eq!(write_ok.status(), StatusCode::OK);

        let write_limited = call(&app, "POST", "/api/wallets", ip).await;
        assert_eq!(write_limited.status(), StatusCode::TOO_MANY_REQUESTS);

        let read_ok = call(&app, "GET", "/api/tokens", ip).await;
        assert_eq!(read_ok.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_probes_use_their_own_budget() {
        let app = test_app(1, 1, 5);
        let ip = "198.51.100.99";

        for _ in 0..5 {
            let response = call(&app, "GET", "/health", ip).await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let limited = call(&app, "GET", "/health", ip).await;
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn distinct_ips_do_not_share_buckets() {
        let app = test_app(1, 1, 10_000);

        let first = call(&app, "GET", "/api/tokens", "192.0.2.1").await;
        assert_eq!(first.status(), StatusCode::OK);

        let other_ip = call(&app, "GET", "/api/tokens", "192.0.2.2").await;
        assert_eq!(other_ip.status(), StatusCode::OK);
    }
}
