//! Core types for the transactional store
//!
//! This module defines the fundamental types used throughout the system:
//! - [`Uid`]: Identifier of a graph entity
//! - [`Key`]: A versioned attribute (entity predicate or index token)
//! - [`VersionedValue`]: One committed entry of a key's history
//! - [`WriteSet`]: Buffered, not-yet-visible writes of a transaction

use crate::value::Value;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Logical commit clock value.
///
/// Allocated once per successful commit. Version 0 means "nothing committed".
pub type CommitTimestamp = u64;

/// Transaction identifier, unique per process.
pub type TxnId = u64;

/// Unique identifier for a graph entity
///
/// Uids are allocated from a process-wide lease and rendered in hex,
/// e.g. `0x2a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Uid(u64);

impl Uid {
    /// Wrap a raw uid
    pub const fn new(raw: u64) -> Self {
        Uid(raw)
    }

    /// Raw numeric form
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Parse the hex form (`0x2a`) or a plain decimal number
    pub fn parse(s: &str) -> Option<Self> {
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => s.parse::<u64>().ok(),
        };
        // uid 0 is never allocated
        parsed.filter(|raw| *raw != 0).map(Uid)
    }
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A versioned key in the shared key space
///
/// Keys are ordered by kind, then predicate, then subject, so conflict
/// reports list them deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Key {
    /// Value of `predicate` on entity `uid`
    Data {
        /// Entity the attribute belongs to
        uid: Uid,
        /// Attribute name
        predicate: String,
    },
    /// Claim on an index token of an indexed predicate
    ///
    /// Every write to an indexed predicate also writes this key, so two
    /// transactions giving the same indexed value to different entities
    /// collide here even though their data keys differ.
    Index {
        /// Indexed attribute name
        predicate: String,
        /// Canonical token (see [`Value::index_token`])
        token: String,
    },
}

impl Key {
    /// Create a data key
    pub fn data(uid: Uid, predicate: impl Into<String>) -> Self {
        Key::Data {
            uid,
            predicate: predicate.into(),
        }
    }

    /// Create an index key
    pub fn index(predicate: impl Into<String>, token: impl Into<String>) -> Self {
        Key::Index {
            predicate: predicate.into(),
            token: token.into(),
        }
    }

    /// Predicate this key belongs to
    pub fn predicate(&self) -> &str {
        match self {
            Key::Data { predicate, .. } | Key::Index { predicate, .. } => predicate,
        }
    }

    /// Whether this is an index token key
    pub fn is_index(&self) -> bool {
        matches!(self, Key::Index { .. })
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Data { uid, predicate } => write!(f, "{}.{}", uid, predicate),
            Key::Index { predicate, token } => write!(f, "index({}, {})", predicate, token),
        }
    }
}

/// One committed entry in a key's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedValue {
    /// Value written, `None` for a tombstone
    pub value: Option<Value>,
    /// Commit timestamp that made this entry visible
    pub version: CommitTimestamp,
    /// Wall-clock commit time (Unix seconds)
    pub timestamp: i64,
}

impl VersionedValue {
    /// Whether this entry deletes the key
    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }
}

/// Pending writes of a single transaction
///
/// Last write wins per key; `None` buffers a delete.
#[derive(Debug, Clone, Default)]
pub struct WriteSet {
    writes: FxHashMap<Key, Option<Value>>,
}

impl WriteSet {
    /// Create an empty write set
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a write, replacing any earlier pending write to `key`
    pub fn put(&mut self, key: Key, value: Value) {
        self.writes.insert(key, Some(value));
    }

    /// Buffer a delete
    pub fn delete(&mut self, key: Key) {
        self.writes.insert(key, None);
    }

    /// Pending entry for `key`
    ///
    /// `Some(None)` means the transaction deleted the key.
    pub fn get(&self, key: &Key) -> Option<&Option<Value>> {
        self.writes.get(key)
    }

    /// Whether `key` has a pending write
    pub fn contains(&self, key: &Key) -> bool {
        self.writes.contains_key(key)
    }

    /// Number of distinct keys written
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Whether nothing was written
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Iterate over keys
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.writes.keys()
    }

    /// Iterate over pending entries
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Option<Value>)> {
        self.writes.iter()
    }

    /// Forget the pending entry for `key`
    pub fn remove(&mut self, key: &Key) -> Option<Option<Value>> {
        self.writes.remove(key)
    }

    /// Drop all pending writes
    pub fn clear(&mut self) {
        self.writes.clear();
    }
}
