//! Concurrency layer for Tessera
//!
//! This crate implements optimistic concurrency control (OCC) with:
//! - TransactionContext: snapshot version and buffered write set
//! - ConflictDetector: first-committer-wins write-write validation
//! - TransactionManager: serialized validate → apply → publish commit section

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod manager;
pub mod transaction;
pub mod validation;

pub use manager::{TransactionManager, TransactionMetrics};
pub use transaction::{TransactionContext, TransactionStatus};
pub use validation::{ConflictDetector, ConflictRecord};
