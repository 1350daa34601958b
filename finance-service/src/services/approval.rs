//! Payment proof workflow: submission, approval, rejection.
//!
//! Approval is one unit of work: bill settlement, payment records, cash
//! book entries and the wallet top-up either all commit or none do. The
//! guardian notification runs after the commit and is best-effort.

use crate::middleware::ActorContext;
use crate::models::{
    EntryDirection, PaymentProof, PaymentRecord, ProofKind, ProofStatus, Wallet,
    WalletTransaction, WalletTxKind,
};
use crate::services::database::Database;
use crate::services::metrics::PROOFS_PROCESSED_TOTAL;
use crate::services::notifier::Notifier;
use crate::services::numbering::{self, NewCashBookEntry};
use chrono::Utc;
use service_core::error::AppError;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Payment method stamped on records created from transfer receipts.
const TRANSFER_METHOD: &str = "transfer";

/// Category of cash book inflows created by bill settlement.
const BILL_PAYMENT_CATEGORY: &str = "bill_payment";

/// Input for a new proof submission.
#[derive(Debug, Clone)]
pub struct SubmitProofInput {
    pub student_id: Uuid,
    pub kind: ProofKind,
    pub bill_ids: Vec<Uuid>,
    pub total_amount: i64,
    pub topup_amount: Option<i64>,
    pub note: Option<String>,
    pub blob_ref: String,
}

/// What an approval did, for the response message and the audit log.
#[derive(Debug, Clone)]
pub struct ApprovalOutcome {
    pub proof_id: Uuid,
    pub bill_amount: i64,
    pub topup_amount: i64,
    pub bills_settled: usize,
    pub summary: String,
}

/// Record a submitted transfer receipt as a pending proof.
#[instrument(skip(db, input), fields(student_id = %input.student_id, kind = %input.kind))]
pub async fn submit_proof(
    db: &Database,
    mut input: SubmitProofInput,
) -> Result<PaymentProof, AppError> {
    // Duplicate references would double-link the proof.
    let mut seen = std::collections::HashSet::new();
    input.bill_ids.retain(|id| seen.insert(*id));

    if input.kind.requires_bills() && input.bill_ids.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "A {} proof must reference at least one bill",
            input.kind
        )));
    }
    if input.kind == ProofKind::WalletTopup && !input.bill_ids.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "A wallet top-up proof must not reference bills"
        )));
    }

    let topup_amount = match input.kind {
        ProofKind::BillPayment => Some(0),
        ProofKind::WalletTopup => Some(input.total_amount),
        ProofKind::Combined => input.topup_amount,
    };
    if let Some(topup) = topup_amount {
        if topup < 0 || topup > input.total_amount {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Top-up portion {} must be between 0 and the declared total {}",
                topup,
                input.total_amount
            )));
        }
    }

    let mut tx = db.begin().await?;

    let student = Database::find_student(&mut tx, input.student_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Student not found")))?;

    for bill_id in &input.bill_ids {
        let bill = Database::find_bill(&mut tx, *bill_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Bill {} not found", bill_id)))?;
        if bill.student_id != input.student_id {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Bill {} does not belong to student {}",
                bill_id,
                input.student_id
            )));
        }
        if bill.is_deleted() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Bill {} is no longer active",
                bill_id
            )));
        }
    }

    let proof = PaymentProof {
        proof_id: Uuid::new_v4(),
        student_id: input.student_id,
        kind: input.kind.as_str().to_string(),
        total_amount: input.total_amount,
        topup_amount,
        note: input.note,
        blob_ref: input.blob_ref,
        status: ProofStatus::Pending.as_str().to_string(),
        admin_note: None,
        processed_by: None,
        processed_utc: None,
        created_utc: Utc::now(),
    };

    Database::insert_proof(&mut tx, &proof).await?;
    for bill_id in &input.bill_ids {
        Database::insert_proof_bill(&mut tx, proof.proof_id, *bill_id).await?;
    }

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to commit: {}", e)))?;

    info!(
        proof_id = %proof.proof_id,
        student = %student.name,
        total_amount = proof.total_amount,
        bill_count = input.bill_ids.len(),
        "Payment proof submitted"
    );

    Ok(proof)
}

/// Approve a pending proof: settle every referenced bill in full, record
/// the settlements in the cash book, credit the wallet top-up portion, and
/// stamp the proof approved.
#[instrument(skip(db, notifier, admin_note, actor), fields(proof_id = %proof_id, actor = %actor.actor_id))]
pub async fn approve_proof(
    db: &Database,
    notifier: &Notifier,
    book_id: Uuid,
    proof_id: Uuid,
    admin_note: Option<&str>,
    actor: &ActorContext,
) -> Result<ApprovalOutcome, AppError> {
    let mut tx = db.begin().await?;

    let proof = Database::find_proof(&mut tx, proof_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Proof not found")))?;

    if !proof.is_pending() {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Proof is already {}",
            proof.status
        )));
    }

    let student = Database::find_student(&mut tx, proof.student_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Student not found")))?;

    let bill_ids = Database::proof_bill_ids(&mut tx, proof_id).await?;
    let mut bills = Vec::with_capacity(bill_ids.len());
    for bill_id in &bill_ids {
        let bill = Database::find_bill(&mut tx, *bill_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Bill {} not found", bill_id)))?;
        bills.push(bill);
    }

    // The bill portion is what the referenced bills actually still owe; the
    // wallet portion is whatever the declared total leaves over. The
    // declared split is advisory only, so a stale or mistyped figure cannot
    // make money disappear.
    let bill_amount: i64 = bills
        .iter()
        .filter(|b| !b.is_deleted())
        .map(|b| b.remaining())
        .sum();
    let topup_amount = proof.total_amount - bill_amount;

    if topup_amount < 0 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Declared total {} does not cover the outstanding bill amount {}",
            proof.total_amount,
            bill_amount
        )));
    }
    if proof.parsed_kind() == ProofKind::BillPayment && topup_amount != 0 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Bill payment total {} does not match the outstanding amount {}",
            proof.total_amount,
            bill_amount
        )));
    }

    if let Some(declared) = proof.declared_topup() {
        if declared != topup_amount {
            warn!(
                proof_id = %proof_id,
                declared_topup = declared,
                computed_topup = topup_amount,
                "reconciliation_mismatch: declared split disagrees with bill balances"
            );
        }
    }

    let today = Utc::now().date_naive();
    let mut bills_settled = 0usize;

    for bill in &bills {
        let remaining = bill.remaining();
        if bill.is_deleted() || remaining == 0 {
            warn!(
                proof_id = %proof_id,
                bill_id = %bill.bill_id,
                "Referenced bill has nothing to settle, skipping"
            );
            continue;
        }

        Database::settle_bill(&mut tx, bill.bill_id).await?;

        let record = PaymentRecord {
            payment_id: Uuid::new_v4(),
            bill_id: bill.bill_id,
            proof_id: Some(proof_id),
            amount: remaining,
            remaining_before: remaining,
            remaining_after: 0,
            method: TRANSFER_METHOD.to_string(),
            created_by: actor.actor_id.clone(),
            created_utc: Utc::now(),
        };
        Database::insert_payment_record(&mut tx, &record).await?;

        let entry = numbering::append_entry(
            &mut tx,
            NewCashBookEntry {
                book_id,
                direction: EntryDirection::In,
                category: BILL_PAYMENT_CATEGORY.to_string(),
                amount: remaining,
                payment_id: Some(record.payment_id),
                description: Some(format!("{} - {}", bill.title, student.name)),
            },
            today,
            &actor.actor_id,
        )
        .await?;

        info!(
            proof_id = %proof_id,
            bill_id = %bill.bill_id,
            amount = remaining,
            doc_number = %entry.doc_number,
            "Bill settled"
        );
        bills_settled += 1;
    }

    if topup_amount > 0 {
        let wallet = Database::get_or_create_wallet(&mut tx, proof.student_id).await?;
        credit_wallet_topup(&mut tx, &wallet, topup_amount, actor).await?;
        info!(
            proof_id = %proof_id,
            wallet_id = %wallet.wallet_id,
            amount = topup_amount,
            "Wallet top-up credited"
        );
    }

    let summary = compose_summary(bills_settled, bill_amount, topup_amount, admin_note);
    Database::finalize_proof(
        &mut tx,
        proof_id,
        ProofStatus::Approved,
        &summary,
        &actor.actor_id,
    )
    .await?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to commit: {}", e)))?;

    PROOFS_PROCESSED_TOTAL
        .with_label_values(&["approved"])
        .inc();

    info!(
        proof_id = %proof_id,
        bill_amount = bill_amount,
        topup_amount = topup_amount,
        bills_settled = bills_settled,
        "Payment proof approved"
    );

    notifier
        .payment_approved(proof.student_id, &proof.kind, proof.total_amount)
        .await;

    Ok(ApprovalOutcome {
        proof_id,
        bill_amount,
        topup_amount,
        bills_settled,
        summary,
    })
}

/// Reject a pending proof. The note is mandatory: guardians see it.
#[instrument(skip(db, notifier, note, actor), fields(proof_id = %proof_id, actor = %actor.actor_id))]
pub async fn reject_proof(
    db: &Database,
    notifier: &Notifier,
    proof_id: Uuid,
    note: &str,
    actor: &ActorContext,
) -> Result<(), AppError> {
    if note.trim().is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "A rejection note is required"
        )));
    }

    let mut tx = db.begin().await?;

    let proof = Database::find_proof(&mut tx, proof_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Proof not found")))?;

    if !proof.is_pending() {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Proof is already {}",
            proof.status
        )));
    }

    Database::finalize_proof(&mut tx, proof_id, ProofStatus::Rejected, note, &actor.actor_id)
        .await?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to commit: {}", e)))?;

    PROOFS_PROCESSED_TOTAL
        .with_label_values(&["rejected"])
        .inc();

    info!(proof_id = %proof_id, "Payment proof rejected");

    notifier.payment_rejected(proof.student_id, note).await;

    Ok(())
}

async fn credit_wallet_topup(
    conn: &mut sqlx::SqliteConnection,
    wallet: &Wallet,
    amount: i64,
    actor: &ActorContext,
) -> Result<(), AppError> {
    let balance_after = Database::apply_wallet_delta(conn, wallet.wallet_id, amount, false)
        .await?
        .ok_or_else(|| {
            AppError::DatabaseError(anyhow::anyhow!("Wallet balance update matched no row"))
        })?;

    let row = WalletTransaction {
        transaction_id: Uuid::new_v4(),
        wallet_id: wallet.wallet_id,
        kind: WalletTxKind::Credit.as_str().to_string(),
        amount,
        balance_after,
        description: Some(format!(
            "Top-up saku dari bukti transfer, disetujui oleh {}",
            actor.actor_name
        )),
        method: TRANSFER_METHOD.to_string(),
        pool_id: None,
        voided: false,
        voided_by: None,
        void_reason: None,
        voided_utc: None,
        replaces_transaction_id: None,
        created_by: actor.actor_id.clone(),
        created_utc: Utc::now(),
    };
    Database::insert_wallet_transaction(conn, &row).await
}

fn compose_summary(
    bills_settled: usize,
    bill_amount: i64,
    topup_amount: i64,
    admin_note: Option<&str>,
) -> String {
    let mut parts = Vec::new();
    if bills_settled > 0 {
        parts.push(format!(
            "{} tagihan dilunasi senilai Rp{}",
            bills_settled, bill_amount
        ));
    }
    if topup_amount > 0 {
        parts.push(format!("top-up saku Rp{}", topup_amount));
    }
    if parts.is_empty() {
        parts.push("tidak ada mutasi".to_string());
    }

    let mut summary = parts.join("; ");
    if let Some(note) = admin_note {
        if !note.trim().is_empty() {
            summary.push_str(&format!(" (catatan: {})", note.trim()));
        }
    }
    summary
}
