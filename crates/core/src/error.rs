//! Error types for the transactional core
//!
//! Every fallible operation in the workspace returns [`Result`]. Errors are
//! always surfaced to the immediate caller; nothing is retried internally.

use crate::types::Key;
use thiserror::Error;

/// Errors raised by the store, the transaction layer, and their collaborators
#[derive(Debug, Error)]
pub enum Error {
    /// Operation attempted on a transaction not in the required state
    /// (e.g. mutate after commit)
    #[error("invalid transaction state: {0}")]
    InvalidState(String),

    /// Commit failed optimistic validation
    ///
    /// `keys` lists, in key order, every written key that another
    /// transaction committed after this one started.
    #[error("transaction conflict on {}", join_keys(.keys))]
    TransactionConflict {
        /// Conflicting keys, sorted
        keys: Vec<Key>,
    },

    /// The version store could not serve the request
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Value does not match the declared schema of its predicate
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// Malformed input (schema text, N-Quads, arguments)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Bug or invariant violation
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

fn join_keys(keys: &[Key]) -> String {
    keys.iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Check if this is a commit conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::TransactionConflict { .. })
    }

    /// Check if redoing the logical operation in a new transaction may succeed
    pub fn is_retryable(&self) -> bool {
        self.is_conflict()
    }

    /// Keys named by a conflict error, empty otherwise
    pub fn conflicting_keys(&self) -> &[Key] {
        match self {
            Error::TransactionConflict { keys } => keys,
            _ => &[],
        }
    }
}
