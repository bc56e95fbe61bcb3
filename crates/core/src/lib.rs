//! Core types for Tessera
//!
//! This crate defines the vocabulary shared by every layer:
//! - Keys, values, and commit timestamps
//! - Write sets buffered by transactions
//! - The canonical error type
//! - Collaborator traits ([`VersionStore`], [`CommitObserver`])

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use traits::{AppliedWrite, CommitObserver, NoopObserver, VersionStore};
pub use types::{CommitTimestamp, Key, TxnId, Uid, VersionedValue, WriteSet};
pub use value::Value;
