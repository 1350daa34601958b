//! Student handlers: the minimal surface the ledgers need.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{CreateStudentRequest, TransferOutRequest},
    middleware::ActorContext,
    models::Student,
    services::transfer::{self, TransferOutSummary},
    startup::AppState,
};

/// Create a minimal student row.
pub async fn create_student(
    State(state): State<AppState>,
    Json(payload): Json<CreateStudentRequest>,
) -> Result<(StatusCode, Json<Student>), AppError> {
    payload.validate()?;

    let student = state
        .db
        .create_student(
            &payload.name,
            payload.class_name.as_deref(),
            payload.dormitory.as_deref(),
            payload.guardian_phone.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(student)))
}

/// Get a student.
pub async fn get_student(
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
) -> Result<Json<Student>, AppError> {
    let student = state
        .db
        .get_student(student_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Student not found")))?;

    Ok(Json(student))
}

/// Mark a student transferred out and reconcile their future bills.
pub async fn transfer_out(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(student_id): Path<Uuid>,
    Json(payload): Json<TransferOutRequest>,
) -> Result<Json<TransferOutSummary>, AppError> {
    payload.validate()?;

    let summary =
        transfer::transfer_out(&state.db, student_id, &payload.effective_month, &actor).await?;

    Ok(Json(summary))
}
