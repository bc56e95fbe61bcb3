//! Commit-time conflict detection
//!
//! First-committer-wins on exact keys: a written key conflicts when some
//! other transaction committed a newer version of it after this
//! transaction's snapshot. Reads are not validated, so read-only
//! transactions never conflict.
//!
//! Detection is only meaningful inside the commit section; run outside it,
//! a concurrent commit could land between the check and the apply.

use crate::transaction::TransactionContext;
use smallvec::SmallVec;
use tessera_core::{Error, Key, Result, VersionStore};

/// Keys of a committing transaction that lost the race
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConflictRecord {
    keys: SmallVec<[Key; 4]>,
}

impl ConflictRecord {
    /// Whether the transaction may commit
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of conflicting keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Conflicting keys, sorted
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Convert into the error surfaced to the caller
    pub fn into_error(self) -> Error {
        Error::TransactionConflict {
            keys: self.keys.into_vec(),
        }
    }
}

/// Write-write conflict detector
pub struct ConflictDetector;

impl ConflictDetector {
    /// Check every written key against the store's latest commits
    pub fn detect<S: VersionStore + ?Sized>(
        txn: &TransactionContext,
        store: &S,
    ) -> Result<ConflictRecord> {
        let mut keys: SmallVec<[Key; 4]> = SmallVec::new();
        for key in txn.write_set().keys() {
            if let Some(latest) = store.latest_commit(key)? {
                if latest > txn.start_version {
                    keys.push(key.clone());
                }
            }
        }
        keys.sort();
        Ok(ConflictRecord { keys })
    }
}
