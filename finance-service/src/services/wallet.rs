//! Wallet ledger operations.
//!
//! Every mutation updates the live balance and appends a ledger row inside
//! one transaction, so the balance always equals the sum of non-voided
//! deltas. Balance arithmetic is a single guarded `UPDATE ... RETURNING`,
//! never a read-modify-write in application code.

use crate::middleware::ActorContext;
use crate::models::{Wallet, WalletTransaction, WalletTxKind};
use crate::services::database::Database;
use crate::services::metrics::WALLET_MUTATIONS_TOTAL;
use chrono::Utc;
use service_core::error::AppError;
use sqlx::SqliteConnection;
use tracing::{info, instrument};
use uuid::Uuid;

/// Input for a manual or device wallet mutation.
#[derive(Debug, Clone)]
pub struct PostTransactionInput {
    pub student_id: Uuid,
    pub kind: WalletTxKind,
    pub amount: i64,
    pub method: String,
    pub description: Option<String>,
    /// Pool mirrored by device kinds; required for `epos_in` / `epos_out`.
    pub pool_id: Option<Uuid>,
}

/// Post a wallet transaction (credit, debit, e-POS movement, cash-out).
#[instrument(skip(db, input, actor), fields(student_id = %input.student_id, kind = %input.kind, amount = input.amount))]
pub async fn post_transaction(
    db: &Database,
    input: PostTransactionInput,
    actor: &ActorContext,
) -> Result<WalletTransaction, AppError> {
    if input.amount <= 0 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Amount must be positive"
        )));
    }
    if input.kind.pool_delta(input.amount).is_some() && input.pool_id.is_none() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "A device transaction must reference a pool"
        )));
    }

    let mut tx = db.begin().await?;

    let student = Database::find_student(&mut tx, input.student_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Student not found")))?;

    let wallet = Database::get_or_create_wallet(&mut tx, input.student_id).await?;

    if let Some(pool_id) = input.pool_id {
        Database::find_pool(&mut tx, pool_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Pool not found")))?;
    }

    let row = apply_in_tx(
        &mut tx,
        &wallet,
        input.kind,
        input.amount,
        input.pool_id,
        &input.method,
        input.description.clone(),
        None,
        actor,
    )
    .await?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to commit: {}", e)))?;

    WALLET_MUTATIONS_TOTAL
        .with_label_values(&[input.kind.as_str()])
        .inc();

    info!(
        transaction_id = %row.transaction_id,
        student = %student.name,
        balance_after = row.balance_after,
        "Wallet transaction posted"
    );

    Ok(row)
}

/// Void a wallet transaction: reverse its balance effect (and its pool
/// effect, for device rows) and flag the row. The row itself is kept for
/// audit, its monetary fields untouched.
#[instrument(skip(db, reason, actor), fields(transaction_id = %transaction_id, actor = %actor.actor_id))]
pub async fn void_transaction(
    db: &Database,
    transaction_id: Uuid,
    reason: &str,
    actor: &ActorContext,
) -> Result<WalletTransaction, AppError> {
    if reason.trim().is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "A void reason is required"
        )));
    }

    let mut tx = db.begin().await?;

    let row = Database::find_wallet_transaction(&mut tx, transaction_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Wallet transaction not found")))?;

    void_in_tx(&mut tx, &row, reason, actor).await?;

    let updated = Database::find_wallet_transaction(&mut tx, transaction_id)
        .await?
        .ok_or_else(|| AppError::DatabaseError(anyhow::anyhow!("Voided row disappeared")))?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to commit: {}", e)))?;

    WALLET_MUTATIONS_TOTAL.with_label_values(&["void"]).inc();

    info!(transaction_id = %transaction_id, "Wallet transaction voided");

    Ok(updated)
}

/// Edit a wallet transaction. Posted rows are never rewritten: the original
/// is voided and a replacement row referencing it is appended, so the audit
/// trail keeps every prior value at arbitrary depth.
#[instrument(skip(db, actor), fields(transaction_id = %transaction_id, actor = %actor.actor_id))]
pub async fn edit_transaction(
    db: &Database,
    transaction_id: Uuid,
    new_amount: i64,
    new_method: Option<String>,
    new_description: Option<String>,
    actor: &ActorContext,
) -> Result<WalletTransaction, AppError> {
    if new_amount <= 0 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Amount must be positive"
        )));
    }

    let mut tx = db.begin().await?;

    let original = Database::find_wallet_transaction(&mut tx, transaction_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Wallet transaction not found")))?;

    void_in_tx(&mut tx, &original, "edited", actor).await?;

    let wallet = fetch_wallet(&mut tx, original.wallet_id).await?;

    let replacement = apply_in_tx(
        &mut tx,
        &wallet,
        original.parsed_kind(),
        new_amount,
        original.pool_id,
        new_method.as_deref().unwrap_or(&original.method),
        new_description.or_else(|| original.description.clone()),
        Some(original.transaction_id),
        actor,
    )
    .await?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to commit: {}", e)))?;

    WALLET_MUTATIONS_TOTAL.with_label_values(&["edit"]).inc();

    info!(
        original_id = %transaction_id,
        replacement_id = %replacement.transaction_id,
        "Wallet transaction edited"
    );

    Ok(replacement)
}

/// Shared posting path: guarded balance update, pool mirror for device
/// kinds, ledger row insert. Used by manual posts, approval top-ups and the
/// edit replacement row.
#[allow(clippy::too_many_arguments)]
async fn apply_in_tx(
    conn: &mut SqliteConnection,
    wallet: &Wallet,
    kind: WalletTxKind,
    amount: i64,
    pool_id: Option<Uuid>,
    method: &str,
    description: Option<String>,
    replaces: Option<Uuid>,
    actor: &ActorContext,
) -> Result<WalletTransaction, AppError> {
    let delta = kind.signed(amount);

    let balance_after = Database::apply_wallet_delta(conn, wallet.wallet_id, delta, false)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!(
                "Insufficient wallet balance for {} of {}",
                kind,
                amount
            ))
        })?;

    if let Some(pool_delta) = kind.pool_delta(amount) {
        let pool_id = pool_id.ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("A device transaction must reference a pool"))
        })?;
        Database::apply_pool_delta(conn, pool_id, pool_delta, false)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(anyhow::anyhow!(
                    "Pool balance cannot absorb a {} of {}",
                    kind,
                    amount
                ))
            })?;
    }

    let row = WalletTransaction {
        transaction_id: Uuid::new_v4(),
        wallet_id: wallet.wallet_id,
        kind: kind.as_str().to_string(),
        amount,
        balance_after,
        description,
        method: method.to_string(),
        pool_id,
        voided: false,
        voided_by: None,
        void_reason: None,
        voided_utc: None,
        replaces_transaction_id: replaces,
        created_by: actor.actor_id.clone(),
        created_utc: Utc::now(),
    };
    Database::insert_wallet_transaction(conn, &row).await?;

    Ok(row)
}

/// Shared void path: reverse the wallet (and pool) effect, flag the row.
/// Reversal may drive a balance negative; that is a deliberate property of
/// administrative corrections. Pool reversal stays guarded: an already
/// drained pool refuses the void.
async fn void_in_tx(
    conn: &mut SqliteConnection,
    row: &WalletTransaction,
    reason: &str,
    actor: &ActorContext,
) -> Result<(), AppError> {
    if row.voided {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Wallet transaction is already voided"
        )));
    }

    let reversal = -row.signed_delta();
    Database::apply_wallet_delta(conn, row.wallet_id, reversal, true)
        .await?
        .ok_or_else(|| {
            AppError::DatabaseError(anyhow::anyhow!("Wallet balance update matched no row"))
        })?;

    if let (Some(pool_id), Some(pool_delta)) =
        (row.pool_id, row.parsed_kind().pool_delta(row.amount))
    {
        Database::apply_pool_delta(conn, pool_id, -pool_delta, false)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(anyhow::anyhow!(
                    "Pool balance cannot absorb reversing this transaction"
                ))
            })?;
    }

    Database::mark_transaction_voided(conn, row.transaction_id, &actor.actor_id, reason).await
}

async fn fetch_wallet(conn: &mut SqliteConnection, wallet_id: Uuid) -> Result<Wallet, AppError> {
    sqlx::query_as::<_, Wallet>(
        r#"
        SELECT wallet_id, student_id, balance, created_utc, updated_utc
        FROM wallets
        WHERE wallet_id = ?1
        "#,
    )
    .bind(wallet_id)
    .fetch_optional(conn)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get wallet: {}", e)))?
    .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Wallet not found")))
}
