//! Database engine for Tessera
//!
//! Ties the layers together:
//! - [`Database`]: owns the version store, commit coordinator, hash index
//!   and schema
//! - [`Transaction`]: graph mutations, point reads and index lookups on a
//!   snapshot
//! - [`Mutation`]: set/delete edits, optionally parsed from N-Quads

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod database;
pub mod mutation;
pub mod options;
pub mod response;
pub mod transaction;

pub use database::{Database, DatabaseMetrics};
pub use mutation::{parse_nquads, Edit, Mutation, Object, Subject};
pub use options::{ConflictScope, DatabaseOptions};
pub use response::{IndexQuery, MutationResponse};
pub use transaction::Transaction;
