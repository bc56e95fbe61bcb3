//! Sharded multi-version storage
//!
//! DashMap keyed by [`Key`], one [`VersionChain`] per key.
//! Reads lock only the target shard; applies lock one shard at a time.
//!
//! # Design
//!
//! - DashMap: 16-way sharded by default
//! - Chains are append-only; nothing is overwritten or removed except by
//!   [`ShardedStore::clear`]
//! - Snapshot isolation comes from the caller: entries stamped above the
//!   published version are ignored by every reader

use crate::chain::VersionChain;
use chrono::Utc;
use dashmap::DashMap;
use tessera_core::{
    CommitTimestamp, Error, Key, Result, VersionStore, VersionedValue, WriteSet,
};

/// Sharded in-memory version store
///
/// # Thread Safety
///
/// All operations are thread-safe. `apply` is expected to be called from a
/// single commit section at a time; it validates every key before mutating
/// any of them, so a rejected apply leaves the store untouched.
///
/// # Example
///
/// ```ignore
/// use tessera_storage::ShardedStore;
/// use std::sync::Arc;
///
/// let store = Arc::new(ShardedStore::new());
/// let value = store.read(&key, snapshot_version)?;
/// ```
pub struct ShardedStore {
    chains: DashMap<Key, VersionChain>,
}

impl ShardedStore {
    /// Create new sharded store
    pub fn new() -> Self {
        Self {
            chains: DashMap::new(),
        }
    }

    /// Create with expected number of keys
    pub fn with_capacity(num_keys: usize) -> Self {
        Self {
            chains: DashMap::with_capacity(num_keys),
        }
    }

    /// Number of keys with at least one version
    pub fn key_count(&self) -> usize {
        self.chains.len()
    }

    /// Total number of versions across all keys
    pub fn total_versions(&self) -> usize {
        self.chains.iter().map(|entry| entry.value().len()).sum()
    }

    /// Check if a key has ever been written
    pub fn contains(&self, key: &Key) -> bool {
        self.chains.contains_key(key)
    }

    /// Full history of a key, oldest first
    pub fn history(&self, key: &Key) -> Vec<VersionedValue> {
        self.chains
            .get(key)
            .map(|chain| chain.versions().to_vec())
            .unwrap_or_default()
    }

    /// Keys whose predicate is `predicate`, sorted
    pub fn keys_for_predicate(&self, predicate: &str) -> Vec<Key> {
        let mut keys: Vec<Key> = self
            .chains
            .iter()
            .filter(|entry| entry.key().predicate() == predicate)
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }

    /// Drop every key and its history
    pub fn clear(&self) {
        self.chains.clear();
    }
}

impl Default for ShardedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShardedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedStore")
            .field("key_count", &self.key_count())
            .field("total_versions", &self.total_versions())
            .finish()
    }
}

impl VersionStore for ShardedStore {
    fn read_versioned(
        &self,
        key: &Key,
        as_of: CommitTimestamp,
    ) -> Result<Option<VersionedValue>> {
        Ok(self
            .chains
            .get(key)
            .and_then(|chain| chain.read_at(as_of).cloned()))
    }

    fn latest_commit(&self, key: &Key) -> Result<Option<CommitTimestamp>> {
        Ok(self.chains.get(key).and_then(|chain| chain.latest_version()))
    }

    fn apply(&self, writes: &WriteSet, version: CommitTimestamp) -> Result<()> {
        if version == 0 {
            return Err(Error::Internal("commit version 0 is reserved".into()));
        }

        // Validate first so a bad version never leaves a half-applied set
        for key in writes.keys() {
            if let Some(chain) = self.chains.get(key) {
                chain.check_append(version)?;
            }
        }

        let timestamp = Utc::now().timestamp();
        for (key, value) in writes.iter() {
            self.chains
                .entry(key.clone())
                .or_insert_with(VersionChain::new)
                .push(value.clone(), version, timestamp)?;
        }

        tracing::trace!(version, keys = writes.len(), "applied write set");
        Ok(())
    }
}
