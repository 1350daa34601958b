//! Cash book document numbering.
//!
//! Numbers have the shape `PREFIX-YYYYMMDD-NNNNN` and are unique within one
//! (book, direction, calendar day) bucket. Allocation goes through the keyed
//! `cash_book_sequences` counter, advanced atomically inside the caller's
//! transaction, so concurrent writers can never observe the same value. A
//! unique violation on insert can still happen against rows imported from
//! the old system; those are absorbed by re-allocating, bounded to
//! [`MAX_NUMBERING_ATTEMPTS`].

use crate::models::{CashBookEntry, EntryDirection};
use crate::services::database::Database;
use crate::services::metrics::DOC_NUMBER_COLLISIONS_TOTAL;
use chrono::{NaiveDate, Utc};
use service_core::error::AppError;
use sqlx::SqliteConnection;
use tracing::warn;
use uuid::Uuid;

pub const MAX_NUMBERING_ATTEMPTS: u32 = 5;

/// Input for one cash book line.
#[derive(Debug, Clone)]
pub struct NewCashBookEntry {
    pub book_id: Uuid,
    pub direction: EntryDirection,
    pub category: String,
    pub amount: i64,
    pub payment_id: Option<Uuid>,
    pub description: Option<String>,
}

/// Render a document number for a bucket position.
pub fn format_doc_number(direction: EntryDirection, date: NaiveDate, seq: i64) -> String {
    format!(
        "{}-{}-{:05}",
        direction.prefix(),
        date.format("%Y%m%d"),
        seq
    )
}

/// Append a numbered entry to a cash book inside the caller's transaction.
///
/// Fails with [`AppError::NumberingExhausted`] when the bucket cannot yield
/// a free number within the attempt budget; the caller's transaction then
/// rolls back as a whole.
pub async fn append_entry(
    conn: &mut SqliteConnection,
    entry: NewCashBookEntry,
    seq_date: NaiveDate,
    created_by: &str,
) -> Result<CashBookEntry, AppError> {
    for _attempt in 1..=MAX_NUMBERING_ATTEMPTS {
        let seq = Database::next_sequence(conn, entry.book_id, entry.direction, seq_date).await?;
        let doc_number = format_doc_number(entry.direction, seq_date, seq);

        let row = CashBookEntry {
            entry_id: Uuid::new_v4(),
            book_id: entry.book_id,
            doc_number: doc_number.clone(),
            direction: entry.direction.as_str().to_string(),
            category: entry.category.clone(),
            amount: entry.amount,
            payment_id: entry.payment_id,
            description: entry.description.clone(),
            created_by: created_by.to_string(),
            created_utc: Utc::now(),
        };

        match Database::try_insert_cash_book_entry(conn, &row).await? {
            Some(inserted) => return Ok(inserted),
            None => {
                DOC_NUMBER_COLLISIONS_TOTAL
                    .with_label_values(&[entry.direction.as_str()])
                    .inc();
                warn!(
                    book_id = %entry.book_id,
                    doc_number = %doc_number,
                    "Document number already taken, re-allocating"
                );
            }
        }
    }

    Err(AppError::NumberingExhausted(anyhow::anyhow!(
        "No free document number for book {} direction {} on {} after {} attempts",
        entry.book_id,
        entry.direction,
        seq_date,
        MAX_NUMBERING_ATTEMPTS
    )))
}
