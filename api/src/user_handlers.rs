use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::{User, Wallet};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::handlers::db_internal_error;
use crate::state::AppState;
use crate::validation::{CreateUserRequest, ValidatedJson};

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, email) VALUES ($1, $2) RETURNING *",
    )
    .bind(&payload.username)
    .bind(&payload.email)
    .fetch_one(&state.db)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            ApiError::new(
                ErrorCode::UserExists,
                format!("Username '{}' is already taken", payload.username),
            )
        } else {
            db_internal_error("insert user", err)
        }
    })?;

    tracing::info!(user_id = %user.id, username = %user.username, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await
        .map_err(|err| db_internal_error("fetch user", err))?
        .ok_or_else(|| ApiError::user_not_found(id))?;

    Ok(Json(user))
}

pub async fn list_user_wallets(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Wallet>>> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(id)
        .fetch_one(&state.db)
        .await
        .map_err(|err| db_internal_error("check user exists", err))?;
    if !exists {
        return Err(ApiError::user_not_found(id));
    }

    let wallets = sqlx::query_as::<_, Wallet>(
        "SELECT * FROM wallets WHERE user_id = $1 ORDER BY created_at ASC",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await
    .map_err(|err| db_internal_error("list user wallets", err))?;

    Ok(Json(wallets))
}
