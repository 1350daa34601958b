//! Domain models for finance-service.

mod bill;
mod cash_book;
mod payment;
mod proof;
mod student;
mod wallet;
mod withdrawal;

pub use bill::{Bill, BillStatus};
pub use cash_book::{CashBook, CashBookEntry, EntryDirection};
pub use payment::PaymentRecord;
pub use proof::{parse_topup_note, PaymentProof, ProofKind, ProofStatus};
pub use student::{Student, StudentStatus};
pub use wallet::{Wallet, WalletTransaction, WalletTxKind};
pub use withdrawal::{Pool, Withdrawal, WithdrawalStatus};
