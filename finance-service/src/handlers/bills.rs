//! Bill handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{CreateBillRequest, EntryListQuery},
    models::{Bill, CashBookEntry, EntryDirection},
    startup::AppState,
};

/// Create a bill for a student and period.
pub async fn create_bill(
    State(state): State<AppState>,
    Json(payload): Json<CreateBillRequest>,
) -> Result<(StatusCode, Json<Bill>), AppError> {
    payload.validate()?;

    state
        .db
        .get_student(payload.student_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Student not found")))?;

    let bill = state
        .db
        .create_bill(
            payload.student_id,
            &payload.title,
            &payload.period,
            payload.nominal,
            payload.due_date,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(bill)))
}

/// List a student's bills. Soft-deleted bills are included so the admin UI
/// can show transfer-out history.
pub async fn list_student_bills(
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
) -> Result<Json<Vec<Bill>>, AppError> {
    let bills = state.db.list_student_bills(student_id, true).await?;
    Ok(Json(bills))
}

/// List a cash book's entries by book code.
pub async fn list_cash_book_entries(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<EntryListQuery>,
) -> Result<Json<Vec<CashBookEntry>>, AppError> {
    let book = state
        .db
        .get_cash_book_by_code(&code)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Cash book not found")))?;

    let direction = query.direction.as_deref().map(EntryDirection::from_str);
    let entries = state.db.list_cash_book_entries(book.book_id, direction).await?;

    Ok(Json(entries))
}
