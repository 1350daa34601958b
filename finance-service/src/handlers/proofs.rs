//! Payment proof handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{ApiMessage, ApproveProofRequest, ProofListQuery, RejectProofRequest, SubmitProofRequest},
    middleware::ActorContext,
    models::{PaymentProof, PaymentRecord},
    services::approval::{self, SubmitProofInput},
    services::database::ProofListRow,
    startup::AppState,
};

/// Submit a transfer receipt for review.
pub async fn submit_proof(
    State(state): State<AppState>,
    Json(payload): Json<SubmitProofRequest>,
) -> Result<(StatusCode, Json<PaymentProof>), AppError> {
    payload.validate()?;

    let proof = approval::submit_proof(
        &state.db,
        SubmitProofInput {
            student_id: payload.student_id,
            kind: payload.kind,
            bill_ids: payload.bill_ids,
            total_amount: payload.total_amount,
            topup_amount: payload.topup_amount,
            note: payload.note,
            blob_ref: payload.blob_ref,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(proof)))
}

/// List proofs, optionally filtered by status.
pub async fn list_proofs(
    State(state): State<AppState>,
    Query(query): Query<ProofListQuery>,
) -> Result<Json<Vec<ProofListRow>>, AppError> {
    let rows = state.db.list_proofs(query.status.as_deref()).await?;
    Ok(Json(rows))
}

/// List the payment records created by an approved proof.
pub async fn list_proof_records(
    State(state): State<AppState>,
    Path(proof_id): Path<Uuid>,
) -> Result<Json<Vec<PaymentRecord>>, AppError> {
    state
        .db
        .get_proof(proof_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Proof not found")))?;

    let records = state.db.list_payment_records_for_proof(proof_id).await?;
    Ok(Json(records))
}

/// Approve a pending proof.
pub async fn approve_proof(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(proof_id): Path<Uuid>,
    Json(payload): Json<ApproveProofRequest>,
) -> Result<Json<ApiMessage>, AppError> {
    let outcome = approval::approve_proof(
        &state.db,
        &state.notifier,
        state.default_book_id,
        proof_id,
        payload.note.as_deref(),
        &actor,
    )
    .await?;

    Ok(Json(ApiMessage::ok(outcome.summary)))
}

/// Reject a pending proof with a mandatory note.
pub async fn reject_proof(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(proof_id): Path<Uuid>,
    Json(payload): Json<RejectProofRequest>,
) -> Result<Json<ApiMessage>, AppError> {
    payload.validate()?;

    approval::reject_proof(&state.db, &state.notifier, proof_id, &payload.note, &actor).await?;

    Ok(Json(ApiMessage::ok("Bukti pembayaran ditolak")))
}
