//! Service layer: storage, workflows, metrics, notifications.

pub mod approval;
pub mod database;
pub mod metrics;
pub mod notifier;
pub mod numbering;
pub mod transfer;
pub mod wallet;
pub mod withdrawal;

pub use database::Database;
pub use metrics::{get_metrics, init_metrics};
pub use notifier::Notifier;
