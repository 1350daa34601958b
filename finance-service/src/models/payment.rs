//! Payment record: one bill settled by one approved proof.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Immutable settlement record with before/after snapshots of the bill's
/// remaining balance.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PaymentRecord {
    pub payment_id: Uuid,
    pub bill_id: Uuid,
    pub proof_id: Option<Uuid>,
    pub amount: i64,
    pub remaining_before: i64,
    pub remaining_after: i64,
    pub method: String,
    pub created_by: String,
    pub created_utc: DateTime<Utc>,
}
