//! Transaction manager for coordinating commit operations
//!
//! Provides atomic commit by orchestrating:
//! 1. Validation (first-committer-wins)
//! 2. Storage application
//! 3. Observer notification (index maintenance)
//! 4. Publication of the new version to readers
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. ensure_active()             - InvalidState unless Active
//! 2. acquire commit lock          - serializes steps 3-8
//! 3. status = Validating
//! 4. ConflictDetector::detect()   - against the latest committed state
//! 5. IF conflicts: abort, return TransactionConflict
//! 6. commit_version = visible + 1
//! 7. store.apply() + observer.on_commit()
//! 8. publish commit_version, status = Committed
//! ```
//!
//! Readers only ever snapshot at a published version, and publication
//! happens after step 7, so no reader observes a half-applied commit.

use crate::transaction::{TransactionContext, TransactionStatus};
use crate::validation::ConflictDetector;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tessera_core::{
    AppliedWrite, CommitObserver, CommitTimestamp, Error, Result, VersionStore,
};

/// Snapshot of transaction counters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransactionMetrics {
    /// Transactions that committed
    pub total_committed: u64,
    /// Transactions that aborted (conflicts, store failures, discards)
    pub total_aborted: u64,
    /// Transactions begun and not yet finished
    pub active_count: u64,
    /// `committed / (committed + aborted)`, 1.0 when nothing finished
    pub commit_rate: f64,
}

/// Manages transaction lifecycle and atomic commits
///
/// The global version counter is incremented once per committing
/// transaction; all keys of a transaction share its commit version.
///
/// # Thread Safety
///
/// The commit operation is serialized via an internal lock to prevent TOCTOU
/// (time-of-check-to-time-of-use) races between validation and storage
/// application. `begin` and reads never take the lock.
pub struct TransactionManager {
    /// Highest version visible to new snapshots
    ///
    /// Monotonically increasing. Advanced only inside the commit lock,
    /// after the store and observer have absorbed the commit.
    version: AtomicU64,

    /// Next transaction ID
    next_txn_id: AtomicU64,

    /// Commit serialization lock
    ///
    /// Without it, two transactions writing the same key could both
    /// validate against the same state and both apply:
    /// 1. T1 validates (succeeds, key at v1)
    /// 2. T2 validates (succeeds, key still at v1)
    /// 3. T1 applies (key now at v2)
    /// 4. T2 applies (uses stale validation from step 2)
    commit_lock: Mutex<()>,

    committed: AtomicU64,
    aborted: AtomicU64,
    active: AtomicU64,
}

impl TransactionManager {
    /// Create a new transaction manager
    ///
    /// # Arguments
    /// * `initial_version` - Starting visible version (0 for an empty store)
    pub fn new(initial_version: CommitTimestamp) -> Self {
        TransactionManager {
            version: AtomicU64::new(initial_version),
            next_txn_id: AtomicU64::new(1),
            commit_lock: Mutex::new(()),
            committed: AtomicU64::new(0),
            aborted: AtomicU64::new(0),
            active: AtomicU64::new(0),
        }
    }

    /// Get current visible version
    pub fn current_version(&self) -> CommitTimestamp {
        self.version.load(Ordering::SeqCst)
    }

    /// Start a transaction snapshotting the current visible version
    pub fn begin(&self) -> TransactionContext {
        let txn_id = self.next_txn_id.fetch_add(1, Ordering::SeqCst);
        let start_version = self.current_version();
        self.active.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(txn_id, start_version, "transaction started");
        TransactionContext::new(txn_id, start_version)
    }

    /// Commit a transaction atomically
    ///
    /// # Returns
    /// - `Ok(commit_version)` on success; for an empty write set, the
    ///   snapshot version (no new version is allocated)
    /// - `Err(InvalidState)` if the transaction is not Active
    /// - `Err(TransactionConflict)` if validation failed
    /// - `Err(StoreUnavailable)` (or any store error) propagated unchanged
    ///
    /// Every error except `InvalidState` leaves the transaction Aborted.
    ///
    /// # Store contract
    ///
    /// `store.apply` must be all-or-nothing, including when it fails.
    pub fn commit<S, O>(
        &self,
        txn: &mut TransactionContext,
        store: &S,
        observer: &O,
    ) -> Result<CommitTimestamp>
    where
        S: VersionStore + ?Sized,
        O: CommitObserver + ?Sized,
    {
        txn.ensure_active()?;

        let _commit_guard = self.commit_lock.lock();
        txn.status = TransactionStatus::Validating;

        let record = match ConflictDetector::detect(txn, store) {
            Ok(record) => record,
            Err(e) => return Err(self.fail(txn, e)),
        };
        if !record.is_empty() {
            tracing::warn!(
                txn_id = txn.txn_id,
                start_version = txn.start_version,
                conflicts = record.len(),
                "transaction aborted on write-write conflict"
            );
            self.finish_aborted(txn, "write-write conflict");
            return Err(record.into_error());
        }

        let visible = self.current_version();
        if txn.write_set().is_empty() {
            txn.mark_committed(visible);
            self.finish_committed();
            return Ok(visible);
        }

        let commit_version = visible + 1;
        let applied = match Self::capture(txn, store, visible) {
            Ok(applied) => applied,
            Err(e) => return Err(self.fail(txn, e)),
        };
        if let Err(e) = store.apply(txn.write_set(), commit_version) {
            return Err(self.fail(txn, e));
        }
        observer.on_commit(&applied, commit_version);

        self.version.store(commit_version, Ordering::SeqCst);
        txn.mark_committed(commit_version);
        self.finish_committed();

        tracing::debug!(
            txn_id = txn.txn_id,
            start_version = txn.start_version,
            commit_version,
            writes = applied.len(),
            "transaction committed"
        );
        Ok(commit_version)
    }

    /// Explicitly abort a transaction
    ///
    /// Touches no shared state besides counters. A no-op on transactions
    /// that already committed or aborted; returns whether the status changed.
    pub fn abort(&self, txn: &mut TransactionContext, reason: impl Into<String>) -> bool {
        let changed = txn.mark_aborted(reason);
        if changed {
            self.aborted.fetch_add(1, Ordering::Relaxed);
            self.release_active();
            tracing::debug!(txn_id = txn.txn_id, "transaction aborted");
        }
        changed
    }

    /// Run `f` while holding the commit lock
    ///
    /// Used for maintenance that must not interleave with commits, such as
    /// dropping all data.
    pub fn exclusive<R>(&self, f: impl FnOnce() -> R) -> R {
        let _commit_guard = self.commit_lock.lock();
        f()
    }

    /// Transaction counters
    pub fn metrics(&self) -> TransactionMetrics {
        let total_committed = self.committed.load(Ordering::Relaxed);
        let total_aborted = self.aborted.load(Ordering::Relaxed);
        let finished = total_committed + total_aborted;
        TransactionMetrics {
            total_committed,
            total_aborted,
            active_count: self.active.load(Ordering::Relaxed),
            commit_rate: if finished == 0 {
                1.0
            } else {
                total_committed as f64 / finished as f64
            },
        }
    }

    /// Pair every pending write with the value it replaces
    fn capture<S: VersionStore + ?Sized>(
        txn: &TransactionContext,
        store: &S,
        visible: CommitTimestamp,
    ) -> Result<Vec<AppliedWrite>> {
        txn.write_set()
            .iter()
            .map(|(key, current)| {
                Ok(AppliedWrite {
                    key: key.clone(),
                    previous: store.read(key, visible)?,
                    current: current.clone(),
                })
            })
            .collect()
    }

    fn fail(&self, txn: &mut TransactionContext, error: Error) -> Error {
        tracing::error!(
            txn_id = txn.txn_id,
            error = %error,
            "store failure during commit, transaction aborted"
        );
        self.finish_aborted(txn, format!("commit failed: {}", error));
        error
    }

    fn finish_aborted(&self, txn: &mut TransactionContext, reason: impl Into<String>) {
        // Validating is not terminal, so this always transitions
        txn.mark_aborted(reason);
        self.aborted.fetch_add(1, Ordering::Relaxed);
        self.release_active();
    }

    fn finish_committed(&self) {
        self.committed.fetch_add(1, Ordering::Relaxed);
        self.release_active();
    }

    /// Decrement the active gauge, saturating at zero
    fn release_active(&self) {
        let _ = self
            .active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_sub(1))
            });
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new(0)
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("version", &self.current_version())
            .field("metrics", &self.metrics())
            .finish()
    }
}
