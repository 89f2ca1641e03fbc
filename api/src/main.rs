mod error;
mod handlers;
mod metrics;
mod metrics_handler;
mod portfolio_handlers;
mod price_recorder;
mod rate_limit;
mod routes;
mod staking_handlers;
mod state;
mod token_handlers;
mod user_handlers;
mod validation;
mod wallet_handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use adapters::{EthRpcClient, PriceFeedClient};
use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use axum::{middleware, Router};
use dotenv::dotenv;
use prometheus::Registry;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use crate::rate_limit::RateLimitState;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("api=debug,tower_http=debug,info")),
        )
        .init();

    let registry = Registry::new_custom(Some("oeconomia".to_string()), None)?;
    metrics::register_all(&registry)?;

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    sqlx::migrate!("../database/migrations").run(&pool).await?;
    tracing::info!("database connected and migrations applied");

    let price_feed = Arc::new(PriceFeedClient::from_env());
    let rpc_url = std::env::var("ETH_RPC_URL").context("ETH_RPC_URL must be set")?;
    let chain = Arc::new(EthRpcClient::new(rpc_url));

    price_recorder::spawn_price_recorder(pool.clone(), price_feed.clone());

    let state = AppState::new(pool, price_feed, chain, registry);
    let rate_limit_state = RateLimitState::from_env();

    let dashboard_origin = std::env::var("DASHBOARD_ORIGIN")
        .unwrap_or_else(|_| "http://localhost:3000".to_string());
    let cors = CorsLayer::new()
        .allow_origin(
            dashboard_origin
                .parse::<HeaderValue>()
                .context("DASHBOARD_ORIGIN is not a valid origin")?,
        )
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let app = Router::new()
        .merge(routes::user_routes())
        .merge(routes::wallet_routes())
        .merge(routes::token_routes())
        .merge(routes::staking_routes())
        .merge(routes::health_routes())
        .merge(routes::observability_routes())
        .fallback(handlers::route_not_found)
        .layer(middleware::from_fn(request_logger))
        .layer(middleware::from_fn_with_state(
            rate_limit_state,
            rate_limit::rate_limit_middleware,
        ))
        .layer(cors)
        .with_state(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|raw| raw.parse::<u16>().ok())
        .unwrap_or(3001);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn request_logger(
    req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = std::time::Instant::now();

    metrics::HTTP_IN_FLIGHT.inc();
    let response = next.run(req).await;
    metrics::HTTP_IN_FLIGHT.dec();

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    metrics::observe_http(method.as_str(), status, elapsed.as_secs_f64());
    tracing::info!("{method} {uri} {status} {}ms", elapsed.as_millis());

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use tower::Service;

    #[tokio::test]
    async fn request_logger_settles_in_flight_and_counts_the_request() {
        let mut app = Router::new()
            .route("/ping", get(|| async { StatusCode::NO_CONTENT }))
            .layer(middleware::from_fn(request_logger));

        let in_flight_before = metrics::HTTP_IN_FLIGHT.get();
        let total_before = metrics::HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "204"])
            .get();

        let response = app
            .call(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        // The gauge is back at its baseline once the response is produced.
        assert_eq!(metrics::HTTP_IN_FLIGHT.get(), in_flight_before);
        assert_eq!(
            metrics::HTTP_REQUESTS_TOTAL
                .with_label_values(&["GET", "204"])
                .get(),
            total_before + 1
        );
    }
}
