use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use shared::StakingPosition;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::handlers::db_internal_error;
use crate::state::AppState;
use crate::validation::{CreateStakingPositionRequest, ValidatedJson};
use crate::wallet_handlers::fetch_wallet;

pub async fn list_wallet_staking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<StakingPosition>>> {
    fetch_wallet(&state, id).await?;

    let positions = sqlx::query_as::<_, StakingPosition>(
        "SELECT * FROM staking_positions WHERE wallet_id = $1 ORDER BY started_at ASC",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await
    .map_err(|err| db_internal_error("list staking positions", err))?;

    Ok(Json(positions))
}

pub async fn create_staking_position(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateStakingPositionRequest>,
) -> ApiResult<(StatusCode, Json<StakingPosition>)> {
    fetch_wallet(&state, payload.wallet_id).await?;

    let token_id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM tokens WHERE symbol = $1")
        .bind(&payload.token_symbol)
        .fetch_optional(&state.db)
        .await
        .map_err(|err| db_internal_error("fetch token id", err))?;
    let token_id = token_id.ok_or_else(|| {
        ApiError::new(
            ErrorCode::UnknownToken,
            format!("Token {} is not registered", payload.token_symbol),
        )
    })?;

    // Amounts were validated as decimal strings by the extractor
    let amount_staked = Decimal::from_str(&payload.amount_staked).map_err(|_| {
        ApiError::new(ErrorCode::InvalidAmount, "amount_staked is not a decimal")
    })?;
    let rewards_earned = match payload.rewards_earned {
        Some(ref raw) => Decimal::from_str(raw).map_err(|_| {
            ApiError::new(ErrorCode::InvalidAmount, "rewards_earned is not a decimal")
        })?,
        None => Decimal::ZERO,
    };
    let apy = match payload.apy {
        Some(value) => Some(Decimal::from_f64_retain(value).ok_or_else(|| {
            ApiError::new(ErrorCode::InvalidApy, "apy is out of range")
        })?),
        None => None,
    };

    let position = sqlx::query_as::<_, StakingPosition>(
        "INSERT INTO staking_positions
             (wallet_id, token_id, pool_name, amount_staked, rewards_earned, apy)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(payload.wallet_id)
    .bind(token_id)
    .bind(&payload.pool_name)
    .bind(amount_staked)
    .bind(rewards_earned)
    .bind(apy)
    .fetch_one(&state.db)
    .await
    .map_err(|err| db_internal_error("insert staking position", err))?;

    tracing::info!(
        position_id = %position.id,
        wallet_id = %position.wallet_id,
        pool = %position.pool_name,
        "staking position created"
    );
    Ok((StatusCode::CREATED, Json(position)))
}

pub async fn delete_staking_position(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let deleted = sqlx::query("DELETE FROM staking_positions WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await
        .map_err(|err| db_internal_error("delete staking position", err))?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::new(
            ErrorCode::PositionNotFound,
            format!("Staking position {} not found", id),
        ));
    }

    Ok(StatusCode::NO_CONTENT)
}
