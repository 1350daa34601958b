//! Cash book and entry models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Entry direction: money into or out of the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryDirection {
    In,
    Out,
}

impl EntryDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "out" => Self::Out,
            _ => Self::In,
        }
    }

    /// Document number prefix: KM (kas masuk) for inflow, KK (kas keluar)
    /// for outflow.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::In => "KM",
            Self::Out => "KK",
        }
    }
}

impl std::fmt::Display for EntryDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named ledger book, e.g. the school's general cash book.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CashBook {
    pub book_id: Uuid,
    pub code: String,
    pub name: String,
    pub created_utc: DateTime<Utc>,
}

/// A numbered inflow/outflow line. Immutable once written; corrections are
/// new entries.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CashBookEntry {
    pub entry_id: Uuid,
    pub book_id: Uuid,
    pub doc_number: String,
    pub direction: String,
    pub category: String,
    pub amount: i64,
    pub payment_id: Option<Uuid>,
    pub description: Option<String>,
    pub created_by: String,
    pub created_utc: DateTime<Utc>,
}

impl CashBookEntry {
    pub fn parsed_direction(&self) -> EntryDirection {
        EntryDirection::from_str(&self.direction)
    }
}
