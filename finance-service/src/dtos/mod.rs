//! Request and response DTOs for the HTTP surface.

use crate::models::{ProofKind, WalletTransaction};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// ============================================================================
// Generic responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ApiMessage {
    pub success: bool,
    pub message: String,
}

impl ApiMessage {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

// ============================================================================
// Students & bills
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStudentRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub class_name: Option<String>,
    pub dormitory: Option<String>,
    pub guardian_phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBillRequest {
    pub student_id: Uuid,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 7, max = 7, message = "Period must be YYYY-MM"))]
    pub period: String,
    #[validate(range(min = 1, message = "Nominal must be positive"))]
    pub nominal: i64,
    pub due_date: NaiveDate,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TransferOutRequest {
    #[validate(length(min = 7, max = 7, message = "Effective month must be YYYY-MM"))]
    pub effective_month: String,
}

// ============================================================================
// Payment proofs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitProofRequest {
    pub student_id: Uuid,
    pub kind: ProofKind,
    #[serde(default)]
    pub bill_ids: Vec<Uuid>,
    #[validate(range(min = 1, message = "Total amount must be positive"))]
    pub total_amount: i64,
    /// Wallet portion of a combined transfer.
    pub topup_amount: Option<i64>,
    pub note: Option<String>,
    #[validate(length(min = 1, message = "Blob reference is required"))]
    pub blob_ref: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApproveProofRequest {
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RejectProofRequest {
    #[validate(length(min = 1, message = "A rejection note is required"))]
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct ProofListQuery {
    pub status: Option<String>,
}

// ============================================================================
// Wallet
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct TopupWalletRequest {
    pub student_id: Uuid,
    #[validate(range(min = 1, message = "Amount must be positive"))]
    pub amount: i64,
    #[validate(length(min = 1, message = "Method is required"))]
    pub method: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChargeWalletRequest {
    pub student_id: Uuid,
    #[validate(range(min = 1, message = "Amount must be positive"))]
    pub amount: i64,
    #[validate(length(min = 1, message = "Method is required"))]
    pub method: String,
    pub description: Option<String>,
    /// `true` records the charge as a cash-out instead of a purchase debit.
    #[serde(default)]
    pub cash_out: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PosDirection {
    /// Device sale: wallet pays, pool fills.
    Spend,
    /// Device refund: wallet refunded, pool drained.
    Refund,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PosTransactionRequest {
    pub student_id: Uuid,
    pub pool_id: Uuid,
    pub direction: PosDirection,
    #[validate(range(min = 1, message = "Amount must be positive"))]
    pub amount: i64,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EditWalletTransactionRequest {
    #[validate(range(min = 1, message = "Amount must be positive"))]
    pub amount: i64,
    pub method: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VoidWalletTransactionRequest {
    #[validate(length(min = 1, message = "A void reason is required"))]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct WalletStatementResponse {
    pub student_id: Uuid,
    pub balance: i64,
    pub transactions: Vec<WalletTransaction>,
}

// ============================================================================
// Pools & withdrawals
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePoolRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWithdrawalRequest {
    #[validate(range(min = 1, message = "Amount must be positive"))]
    pub amount: i64,
    pub pool_id: Option<Uuid>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ApproveWithdrawalRequest {
    #[validate(length(min = 1, message = "A payment method is required"))]
    pub method: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RejectWithdrawalRequest {
    #[validate(length(min = 1, message = "A rejection reason is required"))]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawalListQuery {
    pub status: Option<String>,
}

// ============================================================================
// Cash book
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct EntryListQuery {
    pub direction: Option<String>,
}
