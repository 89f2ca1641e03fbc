use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::metrics::DB_QUERY_ERRORS;
use crate::state::AppState;

pub(crate) fn db_internal_error(operation: &str, err: sqlx::Error) -> ApiError {
    DB_QUERY_ERRORS.inc();
    tracing::error!(operation = operation, error = ?err, "database operation failed");
    ApiError::internal("An unexpected database error occurred")
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let uptime = state.started_at.elapsed().as_secs();
    let now = chrono::Utc::now().to_rfc3339();

    let db_ok = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await
        .is_ok();

    if db_ok {
        (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
                "timestamp": now,
                "uptime_secs": uptime
            })),
        )
    } else {
        tracing::warn!(uptime_secs = uptime, "health check degraded — db unreachable");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "degraded",
                "version": env!("CARGO_PKG_VERSION"),
                "timestamp": now,
                "uptime_secs": uptime
            })),
        )
    }
}

pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&state.db)
        .await
        .map_err(|err| db_internal_error("count users", err))?;

    let total_wallets: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM wallets")
        .fetch_one(&state.db)
        .await
        .map_err(|err| db_internal_error("count wallets", err))?;

    let total_tokens: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tokens")
        .fetch_one(&state.db)
        .await
        .map_err(|err| db_internal_error("count tokens", err))?;

    let total_transactions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
        .fetch_one(&state.db)
        .await
        .map_err(|err| db_internal_error("count transactions", err))?;

    Ok(Json(json!({
        "total_users": total_users,
        "total_wallets": total_wallets,
        "total_tokens": total_tokens,
        "total_transactions": total_transactions,
    })))
}

pub async fn route_not_found() -> ApiError {
    ApiError::new(ErrorCode::NotFound, "The requested resource does not exist")
}
