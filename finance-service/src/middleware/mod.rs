//! Request context extractors.

mod actor;

pub use actor::ActorContext;
