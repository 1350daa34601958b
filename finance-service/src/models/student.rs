//! Minimal student read model.
//!
//! Full student administration lives in the main platform; the finance
//! service keeps only what the ledgers and notifications need.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentStatus {
    Active,
    TransferredOut,
}

impl StudentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::TransferredOut => "transferred_out",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "transferred_out" => Self::TransferredOut,
            _ => Self::Active,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Student {
    pub student_id: Uuid,
    pub name: String,
    pub class_name: Option<String>,
    pub dormitory: Option<String>,
    pub guardian_phone: Option<String>,
    pub status: String,
    /// Set when the student transfers out: `YYYY-MM` effective month.
    pub transfer_out_month: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl Student {
    pub fn parsed_status(&self) -> StudentStatus {
        StudentStatus::from_str(&self.status)
    }
}
