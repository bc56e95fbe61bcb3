//! Main database entry point for Tessera.
//!
//! This module provides the `Tessera` struct, the primary entry point for
//! all database operations, and `Txn`, its transaction handle.

use crate::error::{Error, Result};
use std::sync::Arc;
use tessera_concurrency::TransactionStatus;
use tessera_core::{CommitTimestamp, TxnId, Uid, Value};
use tessera_engine::{ConflictScope, DatabaseOptions, IndexQuery, Mutation, MutationResponse};
use tessera_index::Schema;

/// The Tessera database.
///
/// Cloning is cheap; clones share the same underlying database.
///
/// # Example
///
/// ```ignore
/// use tessera::prelude::*;
///
/// let db = Tessera::new();
/// db.alter("xid: string @index(hash) .")?;
///
/// let mut txn = db.new_txn();
/// txn.mutate_nquads(r#"_:user <xid> "xid-1" ."#)?;
/// txn.commit()?;
/// ```
#[derive(Clone)]
pub struct Tessera {
    inner: Arc<tessera_engine::Database>,
}

impl Tessera {
    /// Create an empty database with default settings.
    pub fn new() -> Self {
        Self::from_engine(tessera_engine::Database::new())
    }

    /// Create a builder for database configuration.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let db = Tessera::builder()
    ///     .initial_version(100)
    ///     .schema("xid: string @index(hash) @upsert .")
    ///     .build()?;
    /// ```
    pub fn builder() -> TesseraBuilder {
        TesseraBuilder::new()
    }

    /// Merge schema declarations, indexing newly indexed predicates.
    pub fn alter(&self, schema_text: &str) -> Result<()> {
        self.inner.alter(schema_text).map_err(Error::from)
    }

    /// Remove all data, index entries and schema.
    pub fn drop_all(&self) {
        self.inner.drop_all()
    }

    /// Current schema.
    pub fn schema(&self) -> Schema {
        self.inner.schema()
    }

    /// Start a transaction on the current snapshot.
    pub fn new_txn(&self) -> Txn<'_> {
        Txn {
            inner: self.inner.new_transaction(),
        }
    }

    /// Highest version visible to new transactions.
    pub fn current_version(&self) -> CommitTimestamp {
        self.inner.current_version()
    }

    /// Get database metrics.
    pub fn metrics(&self) -> DatabaseMetrics {
        let metrics = self.inner.metrics();
        DatabaseMetrics {
            transactions_committed: metrics.transactions.total_committed,
            transactions_aborted: metrics.transactions.total_aborted,
            transactions_active: metrics.transactions.active_count,
            commit_rate: metrics.transactions.commit_rate,
            current_version: metrics.current_version,
            keys: metrics.key_count,
        }
    }

    /// The underlying engine database.
    pub fn engine(&self) -> &tessera_engine::Database {
        &self.inner
    }

    fn from_engine(db: tessera_engine::Database) -> Self {
        Self { inner: Arc::new(db) }
    }
}

impl Default for Tessera {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Tessera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tessera").field("inner", &self.inner).finish()
    }
}

/// Database metrics.
#[derive(Debug, Clone)]
pub struct DatabaseMetrics {
    /// Number of committed transactions
    pub transactions_committed: u64,
    /// Number of aborted transactions
    pub transactions_aborted: u64,
    /// Number of currently active transactions
    pub transactions_active: u64,
    /// Commit success rate (0.0 - 1.0)
    pub commit_rate: f64,
    /// Highest visible version
    pub current_version: CommitTimestamp,
    /// Distinct keys stored
    pub keys: usize,
}

/// Builder for database configuration.
pub struct TesseraBuilder {
    options: DatabaseOptions,
    schema: Option<String>,
}

impl TesseraBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            options: DatabaseOptions::default(),
            schema: None,
        }
    }

    /// Start from a full set of engine options.
    pub fn options(mut self, options: DatabaseOptions) -> Self {
        self.options = options;
        self
    }

    /// Visible version of the empty database.
    pub fn initial_version(mut self, version: CommitTimestamp) -> Self {
        self.options.initial_version = version;
        self
    }

    /// Which index tokens take part in conflict detection.
    pub fn conflict_scope(mut self, scope: ConflictScope) -> Self {
        self.options.conflict_scope = scope;
        self
    }

    /// Whether indexed values are checked for concurrent duplicates.
    ///
    /// Turning this off lets two transactions insert the same indexed
    /// value for different entities.
    pub fn index_conflicts(self, enabled: bool) -> Self {
        self.conflict_scope(if enabled {
            ConflictScope::AllIndexed
        } else {
            ConflictScope::Disabled
        })
    }

    /// Expected number of keys.
    pub fn store_capacity(mut self, capacity: usize) -> Self {
        self.options.store_capacity = capacity;
        self
    }

    /// Schema applied when the database is built.
    pub fn schema(mut self, schema_text: impl Into<String>) -> Self {
        self.schema = Some(schema_text.into());
        self
    }

    /// Build the database.
    ///
    /// Fails only if the schema does not parse.
    pub fn build(self) -> Result<Tessera> {
        let db = tessera_engine::Database::with_options(self.options);
        if let Some(schema) = &self.schema {
            db.alter(schema)?;
        }
        Ok(Tessera::from_engine(db))
    }
}

impl Default for TesseraBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A transaction.
///
/// Dropping an uncommitted transaction discards it.
#[derive(Debug)]
pub struct Txn<'db> {
    inner: tessera_engine::Transaction<'db>,
}

impl<'db> Txn<'db> {
    /// Transaction id.
    pub fn id(&self) -> TxnId {
        self.inner.txn_id()
    }

    /// Snapshot version.
    pub fn start_version(&self) -> CommitTimestamp {
        self.inner.start_version()
    }

    /// Lifecycle state.
    pub fn status(&self) -> &TransactionStatus {
        self.inner.status()
    }

    /// Apply a mutation.
    pub fn mutate(&mut self, mutation: &Mutation) -> Result<MutationResponse> {
        self.inner.mutate(mutation).map_err(Error::from)
    }

    /// Apply set edits given as N-Quads.
    pub fn mutate_nquads(&mut self, nquads: &str) -> Result<MutationResponse> {
        let mutation = Mutation::from_set_nquads(nquads)?;
        self.mutate(&mutation)
    }

    /// Apply delete edits given as N-Quads.
    pub fn delete_nquads(&mut self, nquads: &str) -> Result<MutationResponse> {
        let mutation = Mutation::from_delete_nquads(nquads)?;
        self.mutate(&mutation)
    }

    /// Set `predicate` of `uid`.
    pub fn set(&mut self, uid: Uid, predicate: &str, value: impl Into<Value>) -> Result<()> {
        self.inner.set(uid, predicate, value).map_err(Error::from)
    }

    /// Remove `predicate` from `uid`.
    pub fn delete(&mut self, uid: Uid, predicate: &str) -> Result<()> {
        self.inner.delete(uid, predicate).map_err(Error::from)
    }

    /// Read `predicate` of `uid`, seeing this transaction's writes.
    pub fn get(&self, uid: Uid, predicate: &str) -> Result<Option<Value>> {
        self.inner.get(uid, predicate).map_err(Error::from)
    }

    /// Entities whose indexed `predicate` equals `value`.
    pub fn query_by_index(&self, predicate: &str, value: impl Into<Value>) -> Result<IndexQuery> {
        self.inner
            .query_by_index(predicate, value)
            .map_err(Error::from)
    }

    /// Uid assigned to `_:label`.
    pub fn uid_for(&self, label: &str) -> Option<Uid> {
        self.inner.uid_for(label)
    }

    /// Commit, returning the commit version.
    pub fn commit(&mut self) -> Result<CommitTimestamp> {
        self.inner.commit().map_err(Error::from)
    }

    /// Abort. Returns false if already finished.
    pub fn discard(&mut self) -> bool {
        self.inner.discard()
    }
}
