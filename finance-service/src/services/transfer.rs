//! Transfer-out billing reconciliation.
//!
//! When a student leaves effective a given month, bills dated strictly
//! after that month are soft-deleted, except bills that are already overdue
//! with money outstanding: those stay on the books as debt (tunggakan).
//! The rule runs once, against the state at transfer time.

use crate::middleware::ActorContext;
use crate::models::StudentStatus;
use crate::services::database::Database;
use chrono::{NaiveDate, Utc};
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

/// What the reconciliation did.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TransferOutSummary {
    pub student_id: Uuid,
    pub effective_month: String,
    pub bills_removed: usize,
    pub bills_kept_outstanding: usize,
}

/// Mark a student transferred out and reconcile their future bills.
#[instrument(skip(db, actor), fields(student_id = %student_id, effective_month = %effective_month, actor = %actor.actor_id))]
pub async fn transfer_out(
    db: &Database,
    student_id: Uuid,
    effective_month: &str,
    actor: &ActorContext,
) -> Result<TransferOutSummary, AppError> {
    // The month doubles as a lexicographic cutoff, so it has to be YYYY-MM.
    NaiveDate::parse_from_str(&format!("{}-01", effective_month), "%Y-%m-%d").map_err(|_| {
        AppError::BadRequest(anyhow::anyhow!(
            "Effective month must be formatted YYYY-MM, got '{}'",
            effective_month
        ))
    })?;

    let mut tx = db.begin().await?;

    let student = Database::find_student(&mut tx, student_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Student not found")))?;

    if student.parsed_status() == StudentStatus::TransferredOut {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Student is already transferred out"
        )));
    }

    Database::mark_transferred_out(&mut tx, student_id, effective_month).await?;

    let future_bills = Database::list_bills_after_period(&mut tx, student_id, effective_month).await?;

    let today = Utc::now().date_naive();
    let mut bills_removed = 0usize;
    let mut bills_kept_outstanding = 0usize;

    for bill in &future_bills {
        if bill.is_overdue(today) {
            // Already due and unpaid: stays on the books as tunggakan.
            bills_kept_outstanding += 1;
            info!(
                bill_id = %bill.bill_id,
                period = %bill.period,
                remaining = bill.remaining(),
                "Keeping overdue bill as outstanding debt"
            );
        } else {
            Database::soft_delete_bill(&mut tx, bill.bill_id).await?;
            bills_removed += 1;
        }
    }

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to commit: {}", e)))?;

    info!(
        student = %student.name,
        bills_removed = bills_removed,
        bills_kept_outstanding = bills_kept_outstanding,
        "Student transferred out, bills reconciled"
    );

    Ok(TransferOutSummary {
        student_id,
        effective_month: effective_month.to_string(),
        bills_removed,
        bills_kept_outstanding,
    })
}
