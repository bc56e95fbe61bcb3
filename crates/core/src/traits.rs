//! Collaborator traits
//!
//! The transaction layer talks to storage and to the index only through
//! these traits, so either side can be replaced (a remote store, a fault
//! injecting wrapper in tests) without touching commit logic.

use crate::error::Result;
use crate::types::{CommitTimestamp, Key, VersionedValue, WriteSet};
use crate::value::Value;

/// Committed key history with snapshot reads
///
/// # Visibility
///
/// `apply` is only called from inside the commit critical section, and the
/// caller publishes `version` to readers only after `apply` returns. Readers
/// never ask for a timestamp above the published version, so they never
/// observe a partially applied write set.
pub trait VersionStore: Send + Sync {
    /// Latest entry for `key` with `version <= as_of`, tombstones included
    fn read_versioned(&self, key: &Key, as_of: CommitTimestamp)
        -> Result<Option<VersionedValue>>;

    /// Latest live value for `key` as of `as_of`; tombstones read as absent
    fn read(&self, key: &Key, as_of: CommitTimestamp) -> Result<Option<Value>> {
        Ok(self
            .read_versioned(key, as_of)?
            .and_then(|versioned| versioned.value))
    }

    /// Highest commit timestamp recorded for `key`
    fn latest_commit(&self, key: &Key) -> Result<Option<CommitTimestamp>>;

    /// Append one history entry per key in `writes`, all stamped `version`
    ///
    /// `version` must be strictly greater than every timestamp already
    /// recorded for those keys.
    fn apply(&self, writes: &WriteSet, version: CommitTimestamp) -> Result<()>;
}

/// A write as seen by commit observers
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedWrite {
    /// Key written
    pub key: Key,
    /// Live value before the commit
    pub previous: Option<Value>,
    /// Value after the commit, `None` for a delete
    pub current: Option<Value>,
}

/// Receives every successful commit, in commit-timestamp order
///
/// Called synchronously inside the commit critical section, after the store
/// applied the writes and before the version is published to readers.
pub trait CommitObserver: Send + Sync {
    /// Record the writes of the commit stamped `version`
    fn on_commit(&self, writes: &[AppliedWrite], version: CommitTimestamp);
}

/// Observer that ignores every commit
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl CommitObserver for NoopObserver {
    fn on_commit(&self, _writes: &[AppliedWrite], _version: CommitTimestamp) {}
}
