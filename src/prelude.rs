//! Convenient imports for Tessera.
//!
//! ```ignore
//! use tessera::prelude::*;
//!
//! let db = Tessera::new();
//! let mut txn = db.new_txn();
//! ```

// Main entry point
pub use crate::database::{Tessera, TesseraBuilder, Txn};

// Error handling
pub use crate::error::{Error, Result};

// Core types
pub use crate::{CommitTimestamp, Key, Uid, Value};

// Mutations and results
pub use crate::{ConflictScope, IndexQuery, Mutation, MutationResponse, TransactionStatus};
