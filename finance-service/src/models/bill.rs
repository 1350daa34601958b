//! Bill model: one amount owed per student per period.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Bill settlement status, derived from the paid amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    Unpaid,
    Partial,
    Paid,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Partial => "partial",
            Self::Paid => "paid",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "partial" => Self::Partial,
            "paid" => Self::Paid,
            _ => Self::Unpaid,
        }
    }

    /// Derive the status from the amounts. Overpayment never happens through
    /// the settlement path, but a remaining of zero or less always reads as
    /// paid.
    pub fn for_amounts(nominal: i64, paid_amount: i64) -> Self {
        if nominal - paid_amount <= 0 {
            Self::Paid
        } else if paid_amount > 0 {
            Self::Partial
        } else {
            Self::Unpaid
        }
    }
}

impl std::fmt::Display for BillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A billed amount for one student and one period (e.g. "SPP 2026-08").
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Bill {
    pub bill_id: Uuid,
    pub student_id: Uuid,
    pub title: String,
    /// Billing period as `YYYY-MM`.
    pub period: String,
    pub nominal: i64,
    pub paid_amount: i64,
    pub status: String,
    pub due_date: NaiveDate,
    pub deleted_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Bill {
    pub fn remaining(&self) -> i64 {
        self.nominal - self.paid_amount
    }

    pub fn parsed_status(&self) -> BillStatus {
        BillStatus::from_str(&self.status)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_utc.is_some()
    }

    /// Overdue means past due with money still outstanding.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_date <= today && self.remaining() > 0
    }
}
