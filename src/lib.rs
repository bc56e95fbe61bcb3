//! # Tessera
//!
//! Embedded transactional graph store with optimistic concurrency control.
//!
//! Transactions read a consistent snapshot, buffer their writes, and are
//! validated at commit: if another transaction committed a write to the
//! same key after this one started, the later committer fails with
//! [`Error::Conflict`]. Values of indexed predicates count as keys too, so
//! two transactions cannot both insert the same unique identifier.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tessera::prelude::*;
//!
//! let db = Tessera::new();
//! db.alter("xid: string @index(hash) .")?;
//!
//! let mut txn = db.new_txn();
//! txn.mutate_nquads(r#"_:label_1 <xid> "xid-1" ."#)?;
//! txn.commit()?;
//!
//! let reader = db.new_txn();
//! let found = reader.query_by_index("xid", "xid-1")?;
//! assert_eq!(found.to_json("q").to_string(), r#"{"q":[{"count":1}]}"#);
//! ```

#![warn(missing_docs)]

mod database;
mod error;

pub mod prelude;

// Re-export main entry points
pub use database::{DatabaseMetrics, Tessera, TesseraBuilder, Txn};
pub use error::{Error, Result};

// Re-export types
pub use tessera_concurrency::TransactionStatus;
pub use tessera_core::{CommitTimestamp, Key, TxnId, Uid, Value};
pub use tessera_engine::{
    ConflictScope, DatabaseOptions, Edit, IndexQuery, Mutation, MutationResponse, Object, Subject,
};
pub use tessera_index::{PredicateSchema, Schema, ValueType};
