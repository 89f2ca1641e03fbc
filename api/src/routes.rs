use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::{
    handlers, metrics_handler, portfolio_handlers, staking_handlers, state::AppState,
    token_handlers, user_handlers, wallet_handlers,
};

pub fn observability_routes() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics_handler::metrics_endpoint))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", post(user_handlers::create_user))
        .route("/api/users/:id", get(user_handlers::get_user))
        .route("/api/users/:id/wallets", get(user_handlers::list_user_wallets))
}

pub fn wallet_routes() -> Router<AppState> {
    Router::new()
        .route("/api/wallets", post(wallet_handlers::create_wallet))
        .route(
            "/api/wallets/:id",
            get(wallet_handlers::get_wallet).delete(wallet_handlers::delete_wallet),
        )
        .route("/api/wallets/:id/balances", get(wallet_handlers::get_wallet_balances))
        .route(
            "/api/wallets/:id/transactions",
            get(wallet_handlers::list_wallet_transactions),
        )
        .route(
            "/api/wallets/:id/portfolio",
            get(portfolio_handlers::get_wallet_portfolio),
        )
        .route(
            "/api/wallets/:id/staking",
            get(staking_handlers::list_wallet_staking),
        )
}

pub fn token_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tokens", get(token_handlers::list_tokens))
        .route("/api/tokens/:symbol", get(token_handlers::get_token))
        .route("/api/tokens/:symbol/history", get(token_handlers::get_token_history))
        .route("/api/prices", get(token_handlers::get_prices))
}

pub fn staking_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/staking-positions",
            post(staking_handlers::create_staking_position),
        )
        .route(
            "/api/staking-positions/:id",
            delete(staking_handlers::delete_staking_position),
        )
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/stats", get(handlers::get_stats))
}
