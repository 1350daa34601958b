//! Pool and withdrawal handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        ApproveWithdrawalRequest, CreatePoolRequest, CreateWithdrawalRequest,
        RejectWithdrawalRequest, WithdrawalListQuery,
    },
    middleware::ActorContext,
    models::{Pool, Withdrawal},
    services::withdrawal,
    startup::AppState,
};

/// Create a device pool.
pub async fn create_pool(
    State(state): State<AppState>,
    Json(payload): Json<CreatePoolRequest>,
) -> Result<(StatusCode, Json<Pool>), AppError> {
    payload.validate()?;

    let pool = state.db.create_pool(&payload.name).await?;

    Ok((StatusCode::CREATED, Json(pool)))
}

/// Get a pool with its current balance.
pub async fn get_pool(
    State(state): State<AppState>,
    Path(pool_id): Path<Uuid>,
) -> Result<Json<Pool>, AppError> {
    let pool = state
        .db
        .get_pool(pool_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Pool not found")))?;

    Ok(Json(pool))
}

/// Request a withdrawal.
pub async fn create_withdrawal(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(payload): Json<CreateWithdrawalRequest>,
) -> Result<(StatusCode, Json<Withdrawal>), AppError> {
    payload.validate()?;

    let withdrawal = withdrawal::create_withdrawal(
        &state.db,
        payload.pool_id,
        payload.amount,
        payload.note.as_deref(),
        &actor,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(withdrawal)))
}

/// List withdrawals, optionally filtered by status.
pub async fn list_withdrawals(
    State(state): State<AppState>,
    Query(query): Query<WithdrawalListQuery>,
) -> Result<Json<Vec<Withdrawal>>, AppError> {
    let rows = state.db.list_withdrawals(query.status.as_deref()).await?;
    Ok(Json(rows))
}

/// Approve a pending withdrawal.
pub async fn approve_withdrawal(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(withdrawal_id): Path<Uuid>,
    Json(payload): Json<ApproveWithdrawalRequest>,
) -> Result<Json<Withdrawal>, AppError> {
    payload.validate()?;

    let updated =
        withdrawal::approve_withdrawal(&state.db, withdrawal_id, &payload.method, &actor).await?;

    Ok(Json(updated))
}

/// Reject a pending withdrawal.
pub async fn reject_withdrawal(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(withdrawal_id): Path<Uuid>,
    Json(payload): Json<RejectWithdrawalRequest>,
) -> Result<Json<Withdrawal>, AppError> {
    payload.validate()?;

    let updated =
        withdrawal::reject_withdrawal(&state.db, withdrawal_id, &payload.reason, &actor).await?;

    Ok(Json(updated))
}

/// Complete an approved withdrawal: the pool is drained and the outflow is
/// written to the cash book.
pub async fn complete_withdrawal(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(withdrawal_id): Path<Uuid>,
) -> Result<Json<Withdrawal>, AppError> {
    let updated = withdrawal::complete_withdrawal(
        &state.db,
        state.default_book_id,
        withdrawal_id,
        &actor,
    )
    .await?;

    Ok(Json(updated))
}
