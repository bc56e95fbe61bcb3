//! Storage layer for Tessera
//!
//! This crate implements the multi-version key store:
//! - VersionChain: append-only, strictly increasing per-key history
//! - ShardedStore: DashMap of chains implementing [`VersionStore`]
//!
//! [`VersionStore`]: tessera_core::VersionStore

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chain;
pub mod sharded;

pub use chain::VersionChain;
pub use sharded::ShardedStore;
