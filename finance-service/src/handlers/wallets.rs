//! Wallet handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        ChargeWalletRequest, EditWalletTransactionRequest, PosDirection, PosTransactionRequest,
        TopupWalletRequest, VoidWalletTransactionRequest, WalletStatementResponse,
    },
    middleware::ActorContext,
    models::{WalletTransaction, WalletTxKind},
    services::wallet::{self, PostTransactionInput},
    startup::AppState,
};

/// Wallet balance plus full transaction history for a student.
pub async fn get_statement(
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
) -> Result<Json<WalletStatementResponse>, AppError> {
    state
        .db
        .get_student(student_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Student not found")))?;

    let response = match state.db.get_wallet_by_student(student_id).await? {
        Some(wallet) => {
            let transactions = state.db.list_wallet_transactions(wallet.wallet_id).await?;
            WalletStatementResponse {
                student_id,
                balance: wallet.balance,
                transactions,
            }
        }
        None => WalletStatementResponse {
            student_id,
            balance: 0,
            transactions: Vec::new(),
        },
    };

    Ok(Json(response))
}

/// Manual wallet credit.
pub async fn topup(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(payload): Json<TopupWalletRequest>,
) -> Result<(StatusCode, Json<WalletTransaction>), AppError> {
    payload.validate()?;

    let row = wallet::post_transaction(
        &state.db,
        PostTransactionInput {
            student_id: payload.student_id,
            kind: WalletTxKind::Credit,
            amount: payload.amount,
            method: payload.method,
            description: payload.description,
            pool_id: None,
        },
        &actor,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(row)))
}

/// Manual wallet debit (purchase) or cash-out.
pub async fn charge(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(payload): Json<ChargeWalletRequest>,
) -> Result<(StatusCode, Json<WalletTransaction>), AppError> {
    payload.validate()?;

    let kind = if payload.cash_out {
        WalletTxKind::Withdraw
    } else {
        WalletTxKind::Debit
    };

    let row = wallet::post_transaction(
        &state.db,
        PostTransactionInput {
            student_id: payload.student_id,
            kind,
            amount: payload.amount,
            method: payload.method,
            description: payload.description,
            pool_id: None,
        },
        &actor,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(row)))
}

/// Device (e-POS) wallet movement mirrored onto a pool.
pub async fn pos_transaction(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(payload): Json<PosTransactionRequest>,
) -> Result<(StatusCode, Json<WalletTransaction>), AppError> {
    payload.validate()?;

    let kind = match payload.direction {
        PosDirection::Spend => WalletTxKind::EposOut,
        PosDirection::Refund => WalletTxKind::EposIn,
    };

    let row = wallet::post_transaction(
        &state.db,
        PostTransactionInput {
            student_id: payload.student_id,
            kind,
            amount: payload.amount,
            method: "epos".to_string(),
            description: payload.description,
            pool_id: Some(payload.pool_id),
        },
        &actor,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(row)))
}

/// Edit a wallet transaction: the original is voided, a replacement row is
/// appended.
pub async fn edit_transaction(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(transaction_id): Path<Uuid>,
    Json(payload): Json<EditWalletTransactionRequest>,
) -> Result<Json<WalletTransaction>, AppError> {
    payload.validate()?;

    let replacement = wallet::edit_transaction(
        &state.db,
        transaction_id,
        payload.amount,
        payload.method,
        payload.description,
        &actor,
    )
    .await?;

    Ok(Json(replacement))
}

/// Void a wallet transaction with a mandatory reason.
pub async fn void_transaction(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(transaction_id): Path<Uuid>,
    Json(payload): Json<VoidWalletTransactionRequest>,
) -> Result<Json<WalletTransaction>, AppError> {
    payload.validate()?;

    let voided =
        wallet::void_transaction(&state.db, transaction_id, &payload.reason, &actor).await?;

    Ok(Json(voided))
}
