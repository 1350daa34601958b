//! Student wallet and its append-only transaction ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Wallet transaction kind. `epos_*` kinds are device-originated and also
/// move the linked pool balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletTxKind {
    Credit,
    Debit,
    EposIn,
    EposOut,
    Withdraw,
}

impl WalletTxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
            Self::EposIn => "epos_in",
            Self::EposOut => "epos_out",
            Self::Withdraw => "withdraw",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "debit" => Self::Debit,
            "epos_in" => Self::EposIn,
            "epos_out" => Self::EposOut,
            "withdraw" => Self::Withdraw,
            _ => Self::Credit,
        }
    }

    /// Sign of this kind's effect on the wallet balance.
    pub fn signed(&self, amount: i64) -> i64 {
        match self {
            Self::Credit | Self::EposIn => amount,
            Self::Debit | Self::EposOut | Self::Withdraw => -amount,
        }
    }

    /// Device kinds mirror their amount onto a pool: spending fills the
    /// pool, refunds drain it.
    pub fn pool_delta(&self, amount: i64) -> Option<i64> {
        match self {
            Self::EposOut => Some(amount),
            Self::EposIn => Some(-amount),
            _ => None,
        }
    }
}

impl std::fmt::Display for WalletTxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One wallet per student.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Wallet {
    pub wallet_id: Uuid,
    pub student_id: Uuid,
    pub balance: i64,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Append-only ledger row. Monetary fields are never rewritten: a void sets
/// the lifecycle flags and reverses the balance effect, an edit voids the
/// original and appends a replacement row pointing back at it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WalletTransaction {
    pub transaction_id: Uuid,
    pub wallet_id: Uuid,
    pub kind: String,
    pub amount: i64,
    pub balance_after: i64,
    pub description: Option<String>,
    pub method: String,
    pub pool_id: Option<Uuid>,
    pub voided: bool,
    pub voided_by: Option<String>,
    pub void_reason: Option<String>,
    pub voided_utc: Option<DateTime<Utc>>,
    pub replaces_transaction_id: Option<Uuid>,
    pub created_by: String,
    pub created_utc: DateTime<Utc>,
}

impl WalletTransaction {
    pub fn parsed_kind(&self) -> WalletTxKind {
        WalletTxKind::from_str(&self.kind)
    }

    /// Signed effect of this row on the wallet balance.
    pub fn signed_delta(&self) -> i64 {
        self.parsed_kind().signed(self.amount)
    }
}
