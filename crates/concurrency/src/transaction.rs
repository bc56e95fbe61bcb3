//! Transaction context: per-transaction snapshot and write buffer
//!
//! A context is owned by exactly one client. It never touches shared state
//! while mutating; buffered writes become visible only through
//! [`TransactionManager::commit`](crate::TransactionManager::commit).

use tessera_core::{
    CommitTimestamp, Error, Key, Result, TxnId, Value, VersionStore, WriteSet,
};

/// Lifecycle state of a transaction
///
/// ```text
/// Active ──commit──▶ Validating ──▶ Committed
///    │                    └───────▶ Aborted
///    └──abort/discard────────────▶ Aborted
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Accepting reads and writes
    Active,
    /// Inside the commit section, being checked for conflicts
    Validating,
    /// Writes are visible at `version`
    Committed {
        /// Commit timestamp, or the snapshot version for empty commits
        version: CommitTimestamp,
    },
    /// Finished without effect
    Aborted {
        /// Human-readable cause
        reason: String,
    },
}

impl TransactionStatus {
    /// Whether the transaction reached Committed or Aborted
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Committed { .. } | TransactionStatus::Aborted { .. }
        )
    }

    fn label(&self) -> &'static str {
        match self {
            TransactionStatus::Active => "active",
            TransactionStatus::Validating => "validating",
            TransactionStatus::Committed { .. } => "committed",
            TransactionStatus::Aborted { .. } => "aborted",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-transaction state
pub struct TransactionContext {
    /// Unique transaction id
    pub txn_id: TxnId,
    /// Snapshot version: reads see commits with `version <= start_version`
    pub start_version: CommitTimestamp,
    pub(crate) status: TransactionStatus,
    write_set: WriteSet,
}

impl TransactionContext {
    /// Create an active transaction reading at `start_version`
    ///
    /// Contexts come from [`TransactionManager::begin`](crate::TransactionManager::begin),
    /// which counts them as active.
    pub(crate) fn new(txn_id: TxnId, start_version: CommitTimestamp) -> Self {
        Self {
            txn_id,
            start_version,
            status: TransactionStatus::Active,
            write_set: WriteSet::new(),
        }
    }

    /// Current lifecycle state
    pub fn status(&self) -> &TransactionStatus {
        &self.status
    }

    /// Whether reads and writes are still accepted
    pub fn is_active(&self) -> bool {
        self.status == TransactionStatus::Active
    }

    /// Whether the transaction committed
    pub fn is_committed(&self) -> bool {
        matches!(self.status, TransactionStatus::Committed { .. })
    }

    /// Whether the transaction aborted
    pub fn is_aborted(&self) -> bool {
        matches!(self.status, TransactionStatus::Aborted { .. })
    }

    /// Fail with `InvalidState` unless Active
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Error::InvalidState(format!(
                "transaction {} is {}",
                self.txn_id, self.status
            )))
        }
    }

    /// Buffer a write; the last write to a key wins
    pub fn put(&mut self, key: Key, value: Value) -> Result<()> {
        self.ensure_active()?;
        self.write_set.put(key, value);
        Ok(())
    }

    /// Buffer a delete
    pub fn delete(&mut self, key: Key) -> Result<()> {
        self.ensure_active()?;
        self.write_set.delete(key);
        Ok(())
    }

    /// Drop the pending write to `key`, if any
    ///
    /// Returns whether something was buffered.
    pub fn forget(&mut self, key: &Key) -> Result<bool> {
        self.ensure_active()?;
        Ok(self.write_set.remove(key).is_some())
    }

    /// Read a key: own pending write first, then the snapshot
    pub fn get<S: VersionStore + ?Sized>(&self, store: &S, key: &Key) -> Result<Option<Value>> {
        self.ensure_active()?;
        match self.write_set.get(key) {
            Some(pending) => Ok(pending.clone()),
            None => store.read(key, self.start_version),
        }
    }

    /// Pending entry for `key`, if this transaction wrote it
    pub fn pending(&self, key: &Key) -> Option<&Option<Value>> {
        self.write_set.get(key)
    }

    /// Buffered writes
    pub fn write_set(&self) -> &WriteSet {
        &self.write_set
    }

    /// Transition Validating → Committed
    pub(crate) fn mark_committed(&mut self, version: CommitTimestamp) {
        self.status = TransactionStatus::Committed { version };
    }

    /// Transition to Aborted and drop the write buffer
    ///
    /// Returns false, changing nothing, if already terminal.
    pub(crate) fn mark_aborted(&mut self, reason: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = TransactionStatus::Aborted {
            reason: reason.into(),
        };
        self.write_set.clear();
        true
    }
}

impl std::fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("txn_id", &self.txn_id)
            .field("start_version", &self.start_version)
            .field("status", &self.status)
            .field("writes", &self.write_set.len())
            .finish()
    }
}
