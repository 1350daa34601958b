//! Withdrawal workflow: pending -> approved -> completed, or
//! pending -> rejected.
//!
//! Approval only records the payment method and approver. Money moves at
//! completion: the pool is drained with a guarded decrement and a cash book
//! outflow entry is written, all in one transaction.

use crate::middleware::ActorContext;
use crate::models::{EntryDirection, Withdrawal, WithdrawalStatus};
use crate::services::database::Database;
use crate::services::numbering::{self, NewCashBookEntry};
use chrono::Utc;
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

/// Category of cash book outflows created by completed withdrawals.
const WITHDRAWAL_CATEGORY: &str = "withdrawal";

/// Request a withdrawal from a pool, or as cash when `pool_id` is absent.
#[instrument(skip(db, note, actor), fields(amount = amount, actor = %actor.actor_id))]
pub async fn create_withdrawal(
    db: &Database,
    pool_id: Option<Uuid>,
    amount: i64,
    note: Option<&str>,
    actor: &ActorContext,
) -> Result<Withdrawal, AppError> {
    if amount <= 0 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Amount must be positive"
        )));
    }

    if let Some(pool_id) = pool_id {
        db.get_pool(pool_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Pool not found")))?;
    }

    db.create_withdrawal(pool_id, amount, note, &actor.actor_id)
        .await
}

/// Approve a pending withdrawal with a payment method. No money moves yet.
#[instrument(skip(db, method, actor), fields(withdrawal_id = %withdrawal_id, actor = %actor.actor_id))]
pub async fn approve_withdrawal(
    db: &Database,
    withdrawal_id: Uuid,
    method: &str,
    actor: &ActorContext,
) -> Result<Withdrawal, AppError> {
    if method.trim().is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "A payment method is required"
        )));
    }

    let mut tx = db.begin().await?;

    let withdrawal = Database::find_withdrawal(&mut tx, withdrawal_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Withdrawal not found")))?;

    if withdrawal.parsed_status() != WithdrawalStatus::Pending {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Withdrawal is already {}",
            withdrawal.status
        )));
    }

    Database::set_withdrawal_approved(&mut tx, withdrawal_id, method, &actor.actor_id).await?;

    let updated = Database::find_withdrawal(&mut tx, withdrawal_id)
        .await?
        .ok_or_else(|| AppError::DatabaseError(anyhow::anyhow!("Withdrawal disappeared")))?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to commit: {}", e)))?;

    info!(withdrawal_id = %withdrawal_id, method = method, "Withdrawal approved");

    Ok(updated)
}

/// Reject a pending withdrawal. Terminal; a reason is mandatory.
#[instrument(skip(db, reason, actor), fields(withdrawal_id = %withdrawal_id, actor = %actor.actor_id))]
pub async fn reject_withdrawal(
    db: &Database,
    withdrawal_id: Uuid,
    reason: &str,
    actor: &ActorContext,
) -> Result<Withdrawal, AppError> {
    if reason.trim().is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "A rejection reason is required"
        )));
    }

    let mut tx = db.begin().await?;

    let withdrawal = Database::find_withdrawal(&mut tx, withdrawal_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Withdrawal not found")))?;

    if withdrawal.parsed_status() != WithdrawalStatus::Pending {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Withdrawal is already {}",
            withdrawal.status
        )));
    }

    Database::set_withdrawal_rejected(&mut tx, withdrawal_id, reason, &actor.actor_id).await?;

    let updated = Database::find_withdrawal(&mut tx, withdrawal_id)
        .await?
        .ok_or_else(|| AppError::DatabaseError(anyhow::anyhow!("Withdrawal disappeared")))?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to commit: {}", e)))?;

    info!(withdrawal_id = %withdrawal_id, "Withdrawal rejected");

    Ok(updated)
}

/// Complete an approved withdrawal: drain the pool (when pool-based) and
/// write the cash book outflow.
#[instrument(skip(db, actor), fields(withdrawal_id = %withdrawal_id, actor = %actor.actor_id))]
pub async fn complete_withdrawal(
    db: &Database,
    book_id: Uuid,
    withdrawal_id: Uuid,
    actor: &ActorContext,
) -> Result<Withdrawal, AppError> {
    let mut tx = db.begin().await?;

    let withdrawal = Database::find_withdrawal(&mut tx, withdrawal_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Withdrawal not found")))?;

    if withdrawal.parsed_status() != WithdrawalStatus::Approved {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Only an approved withdrawal can be completed, this one is {}",
            withdrawal.status
        )));
    }

    if let Some(pool_id) = withdrawal.pool_id {
        Database::apply_pool_delta(&mut tx, pool_id, -withdrawal.amount, false)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(anyhow::anyhow!(
                    "Pool balance is below the withdrawal amount {}",
                    withdrawal.amount
                ))
            })?;
    }

    let entry = numbering::append_entry(
        &mut tx,
        NewCashBookEntry {
            book_id,
            direction: EntryDirection::Out,
            category: WITHDRAWAL_CATEGORY.to_string(),
            amount: withdrawal.amount,
            payment_id: None,
            description: withdrawal.note.clone(),
        },
        Utc::now().date_naive(),
        &actor.actor_id,
    )
    .await?;

    Database::set_withdrawal_completed(&mut tx, withdrawal_id).await?;

    let updated = Database::find_withdrawal(&mut tx, withdrawal_id)
        .await?
        .ok_or_else(|| AppError::DatabaseError(anyhow::anyhow!("Withdrawal disappeared")))?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to commit: {}", e)))?;

    info!(
        withdrawal_id = %withdrawal_id,
        amount = withdrawal.amount,
        doc_number = %entry.doc_number,
        "Withdrawal completed"
    );

    Ok(updated)
}
