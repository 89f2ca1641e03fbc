use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{BalanceEntry, PaginatedResponse, Token, Transaction, Wallet, WalletBalancesResponse};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::handlers::db_internal_error;
use crate::metrics::{BALANCE_REFRESHES, BALANCE_REFRESH_ERRORS};
use crate::state::AppState;
use crate::validation::{CreateWalletRequest, ValidatedJson};

pub async fn create_wallet(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateWalletRequest>,
) -> ApiResult<(StatusCode, Json<Wallet>)> {
    let user_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(payload.user_id)
        .fetch_one(&state.db)
        .await
        .map_err(|err| db_internal_error("check user exists", err))?;
    if !user_exists {
        return Err(ApiError::new(
            ErrorCode::UnknownUser,
            format!("User {} does not exist", payload.user_id),
        ));
    }

    let wallet = sqlx::query_as::<_, Wallet>(
        "INSERT INTO wallets (user_id, address, label) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(payload.user_id)
    .bind(&payload.address)
    .bind(&payload.label)
    .fetch_one(&state.db)
    .await
    .map_err(|err| {
        if matches!(&err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")) {
            ApiError::new(
                ErrorCode::WalletExists,
                format!("Wallet {} is already tracked for this user", payload.address),
            )
        } else {
            db_internal_error("insert wallet", err)
        }
    })?;

    tracing::info!(wallet_id = %wallet.id, address = %wallet.address, "wallet created");
    Ok((StatusCode::CREATED, Json(wallet)))
}

pub async fn get_wallet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Wallet>> {
    let wallet = fetch_wallet(&state, id).await?;
    Ok(Json(wallet))
}

pub async fn delete_wallet(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    let deleted = sqlx::query("DELETE FROM wallets WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await
        .map_err(|err| db_internal_error("delete wallet", err))?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::wallet_not_found(id));
    }

    tracing::info!(wallet_id = %id, "wallet deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct BalancesQuery {
    pub refresh: Option<bool>,
}

/// Cached balances for a wallet, optionally refreshed from the chain first.
///
/// A failed chain read never fails the request: the stored value is served
/// and the failure is logged and counted.
pub async fn get_wallet_balances(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<BalancesQuery>,
) -> ApiResult<Json<WalletBalancesResponse>> {
    let wallet = fetch_wallet(&state, id).await?;
    let refresh = query.refresh.unwrap_or(false);

    if refresh {
        refresh_balances(&state, &wallet).await?;
    }

    let balances = sqlx::query_as::<_, BalanceEntry>(
        "SELECT t.symbol, t.name AS token_name, t.contract_address, t.decimals,
                b.balance, b.updated_at
         FROM balances b
         JOIN tokens t ON t.id = b.token_id
         WHERE b.wallet_id = $1
         ORDER BY t.symbol ASC",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await
    .map_err(|err| db_internal_error("list wallet balances", err))?;

    Ok(Json(WalletBalancesResponse {
        wallet_id: wallet.id,
        address: wallet.address,
        refreshed: refresh,
        balances,
    }))
}

async fn refresh_balances(state: &AppState, wallet: &Wallet) -> ApiResult<()> {
    let tokens = sqlx::query_as::<_, Token>("SELECT * FROM tokens ORDER BY symbol ASC")
        .fetch_all(&state.db)
        .await
        .map_err(|err| db_internal_error("list tokens", err))?;

    for token in tokens {
        let read = if token.is_native {
            state.chain.native_balance(&wallet.address).await
        } else if let Some(ref contract) = token.contract_address {
            state
                .chain
                .token_balance(contract, &wallet.address, token.decimals.max(0) as u32)
                .await
        } else {
            continue;
        };

        match read {
            Ok(balance) => {
                BALANCE_REFRESHES.inc();
                sqlx::query(
                    "INSERT INTO balances (wallet_id, token_id, balance, updated_at)
                     VALUES ($1, $2, $3, NOW())
                     ON CONFLICT (wallet_id, token_id)
                     DO UPDATE SET balance = EXCLUDED.balance, updated_at = NOW()",
                )
                .bind(wallet.id)
                .bind(token.id)
                .bind(balance)
                .execute(&state.db)
                .await
                .map_err(|err| db_internal_error("upsert balance", err))?;
            }
            Err(err) => {
                BALANCE_REFRESH_ERRORS.inc();
                tracing::warn!(
                    wallet_id = %wallet.id,
                    symbol = %token.symbol,
                    error = %err,
                    "chain balance read failed, serving stored value"
                );
            }
        }
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn list_wallet_transactions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<TransactionsQuery>,
) -> ApiResult<Json<PaginatedResponse<Transaction>>> {
    fetch_wallet(&state, id).await?;

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * limit;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE wallet_id = $1")
        .bind(id)
        .fetch_one(&state.db)
        .await
        .map_err(|err| db_internal_error("count wallet transactions", err))?;

    let transactions = sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions
         WHERE wallet_id = $1
         ORDER BY block_number DESC, log_index DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db)
    .await
    .map_err(|err| db_internal_error("list wallet transactions", err))?;

    Ok(Json(PaginatedResponse::new(transactions, total, page, limit)))
}

pub(crate) async fn fetch_wallet(state: &AppState, id: Uuid) -> ApiResult<Wallet> {
    sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await
        .map_err(|err| db_internal_error("fetch wallet", err))?
        .ok_or_else(|| ApiError::wallet_not_found(id))
}
