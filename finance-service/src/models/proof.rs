//! Payment proof model: an uploaded transfer receipt awaiting review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// What the transfer claims to cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofKind {
    BillPayment,
    WalletTopup,
    Combined,
}

impl ProofKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BillPayment => "bill_payment",
            Self::WalletTopup => "wallet_topup",
            Self::Combined => "combined",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "wallet_topup" => Self::WalletTopup,
            "combined" => Self::Combined,
            _ => Self::BillPayment,
        }
    }

    /// Whether this kind must reference at least one bill.
    pub fn requires_bills(&self) -> bool {
        matches!(self, Self::BillPayment | Self::Combined)
    }
}

impl std::fmt::Display for ProofKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Review status. Terminal once non-pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofStatus {
    Pending,
    Approved,
    Rejected,
}

impl ProofStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            _ => Self::Pending,
        }
    }
}

/// One submitted transfer receipt.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PaymentProof {
    pub proof_id: Uuid,
    pub student_id: Uuid,
    pub kind: String,
    pub total_amount: i64,
    /// Declared wallet portion. `None` only on rows imported from the old
    /// system, where the split has to be recovered from the note text.
    pub topup_amount: Option<i64>,
    pub note: Option<String>,
    pub blob_ref: String,
    pub status: String,
    pub admin_note: Option<String>,
    pub processed_by: Option<String>,
    pub processed_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}

impl PaymentProof {
    pub fn parsed_kind(&self) -> ProofKind {
        ProofKind::from_str(&self.kind)
    }

    pub fn parsed_status(&self) -> ProofStatus {
        ProofStatus::from_str(&self.status)
    }

    pub fn is_pending(&self) -> bool {
        self.parsed_status() == ProofStatus::Pending
    }

    /// Declared top-up portion, falling back to the legacy note marker for
    /// imported rows.
    pub fn declared_topup(&self) -> Option<i64> {
        self.topup_amount
            .or_else(|| self.note.as_deref().and_then(parse_topup_note))
    }
}

/// Recover the top-up amount from a legacy note such as
/// `"Bayar tagihan Rp550.000, Top-up: Rp100.000"`.
///
/// The old system encoded the combined split only in this free text. New
/// submissions store the split as an explicit column; this parser exists
/// solely so imported rows keep working.
pub fn parse_topup_note(note: &str) -> Option<i64> {
    let lower = note.to_lowercase();
    let marker = lower.find("top-up").or_else(|| lower.find("top up"))?;

    let tail = &lower[marker..];
    let digits: String = tail
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .filter(|c| c.is_ascii_digit())
        .collect();

    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
