//! Public error type
//!
//! Wraps the engine's internal errors in a stable interface. Conflicting
//! keys are rendered as strings so callers don't depend on key internals.

use thiserror::Error;

/// All Tessera errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Operation on a transaction that already committed or aborted
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Another transaction committed a write to the same key first
    #[error("conflict on {}", keys.join(", "))]
    Conflict {
        /// Conflicting keys, e.g. `index(xid, s:xid-1)`
        keys: Vec<String>,
    },

    /// The version store could not be reached
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Value does not match the predicate's declared type
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// Malformed schema, mutation or query
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Internal error (bug or invariant violation)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for Tessera operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is retryable.
    ///
    /// A conflicting transaction may succeed when rerun on a fresh snapshot.
    pub fn is_retryable(&self) -> bool {
        self.is_conflict()
    }

    /// Check if this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// Check if this is a serious/unrecoverable error.
    pub fn is_serious(&self) -> bool {
        matches!(self, Error::Internal(_))
    }
}

impl From<tessera_core::Error> for Error {
    fn from(e: tessera_core::Error) -> Self {
        use tessera_core::Error as CoreError;
        match e {
            CoreError::InvalidState(msg) => Error::InvalidState(msg),
            CoreError::TransactionConflict { keys } => Error::Conflict {
                keys: keys.iter().map(ToString::to_string).collect(),
            },
            CoreError::StoreUnavailable(msg) => Error::StoreUnavailable(msg),
            CoreError::SchemaViolation(msg) => Error::SchemaViolation(msg),
            CoreError::InvalidInput(msg) => Error::InvalidInput(msg),
            CoreError::Internal(msg) => Error::Internal(msg),
        }
    }
}
