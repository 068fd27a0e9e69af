//! Shared value types for composable pipelines: the data records that flow
//! between stages, the failure record that replaces them when a stage cannot
//! complete, and the two-variant outcome that carries either.

pub mod data;
pub mod not_completed;
pub mod outcome;

pub use data::{identifier_stem, Data, IDENTIFIER_TYPE, SERIALISABLE_TYPE};
pub use not_completed::{FailureKind, NotCompleted, NOT_COMPLETED_TYPE};
pub use outcome::Outcome;

/// Version stamped into serialized failure records.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
