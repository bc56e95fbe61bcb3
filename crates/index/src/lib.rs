//! Schema and secondary index for Tessera
//!
//! - [`Schema`]: predicate declarations (`xid: string @index(hash) .`)
//! - [`HashIndex`]: versioned equality index kept consistent with the
//!   version store by observing commits

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod hash_index;
pub mod schema;

pub use hash_index::HashIndex;
pub use schema::{PredicateSchema, Schema, Tokenizer, ValueType};
