//! Withdrawal workflow and device pool models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Withdrawal lifecycle. `rejected` and `completed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            "completed" => Self::Completed,
            _ => Self::Pending,
        }
    }
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregated balance fed by device wallet transactions and drained only by
/// completed withdrawals.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Pool {
    pub pool_id: Uuid,
    pub name: String,
    pub balance: i64,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// A request to move funds out of a pool (or as cash when `pool_id` is
/// absent) into the school's external accounts.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Withdrawal {
    pub withdrawal_id: Uuid,
    pub pool_id: Option<Uuid>,
    pub amount: i64,
    pub status: String,
    pub method: Option<String>,
    pub note: Option<String>,
    pub reject_reason: Option<String>,
    pub requested_by: String,
    pub processed_by: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub processed_utc: Option<DateTime<Utc>>,
    pub completed_utc: Option<DateTime<Utc>>,
}

impl Withdrawal {
    pub fn parsed_status(&self) -> WithdrawalStatus {
        WithdrawalStatus::from_str(&self.status)
    }

    pub fn is_cash(&self) -> bool {
        self.pool_id.is_none()
    }
}
