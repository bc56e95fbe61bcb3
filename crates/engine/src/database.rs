//! Database handle
//!
//! Owns every piece of shared state: the version store, the commit
//! coordinator, the hash index and the schema. Transactions borrow the
//! database, so nothing outlives it and there is no global state.

use crate::options::{ConflictScope, DatabaseOptions};
use crate::transaction::Transaction;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tessera_concurrency::{TransactionManager, TransactionMetrics};
use tessera_core::{CommitTimestamp, Error, Key, Result, Uid, VersionStore, VersionedValue};
use tessera_index::{HashIndex, PredicateSchema, Schema};
use tessera_storage::ShardedStore;

/// Point-in-time database statistics
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseMetrics {
    /// Highest version visible to new transactions
    pub current_version: CommitTimestamp,
    /// Distinct keys ever written
    pub key_count: usize,
    /// History entries across all keys
    pub total_versions: usize,
    /// Declared predicates
    pub schema_predicates: usize,
    /// Transaction counters
    pub transactions: TransactionMetrics,
}

/// In-memory transactional graph database
pub struct Database {
    options: DatabaseOptions,
    store: ShardedStore,
    manager: TransactionManager,
    index: HashIndex,
    schema: RwLock<Schema>,
    /// Next uid handed out for a blank node
    next_uid: AtomicU64,
}

impl Database {
    /// Empty database with default options
    pub fn new() -> Self {
        Self::with_options(DatabaseOptions::default())
    }

    /// Empty database
    pub fn with_options(options: DatabaseOptions) -> Self {
        tracing::debug!(
            initial_version = options.initial_version,
            conflict_scope = ?options.conflict_scope,
            "database created"
        );
        Self {
            store: ShardedStore::with_capacity(options.store_capacity),
            manager: TransactionManager::new(options.initial_version),
            index: HashIndex::new(),
            schema: RwLock::new(Schema::new()),
            next_uid: AtomicU64::new(1),
            options,
        }
    }

    /// Options the database was created with
    pub fn options(&self) -> &DatabaseOptions {
        &self.options
    }

    /// Start a transaction on the current snapshot
    pub fn new_transaction(&self) -> Transaction<'_> {
        Transaction::new(self, self.manager.begin())
    }

    /// Apply schema declarations
    ///
    /// Declarations are merged over the current schema. Predicates that
    /// become indexed are indexed from their values at the current version;
    /// transactions whose snapshot predates the alter see no index entries
    /// for them. Runs under the commit lock.
    pub fn alter(&self, schema_text: &str) -> Result<()> {
        let declared = Schema::parse(schema_text)?;

        self.manager.exclusive(|| {
            let version = self.manager.current_version();
            let mut schema = self.schema.write();
            for decl in declared.iter() {
                let was_indexed = schema.is_indexed(&decl.name);
                if decl.is_indexed() && !was_indexed {
                    self.reindex(decl, version)?;
                } else if !decl.is_indexed() && was_indexed {
                    self.index.untrack(&decl.name);
                }
            }
            let predicates = declared.len();
            schema.merge(declared);
            tracing::debug!(version, predicates, "schema altered");
            Ok(())
        })
    }

    /// Remove all data, index entries and schema
    ///
    /// The version counter keeps its value. Transactions still running
    /// afterwards validate against the emptied store.
    pub fn drop_all(&self) {
        self.manager.exclusive(|| {
            self.store.clear();
            self.index.clear();
            *self.schema.write() = Schema::new();
        });
        tracing::debug!(version = self.current_version(), "all data dropped");
    }

    /// Copy of the current schema
    pub fn schema(&self) -> Schema {
        self.schema.read().clone()
    }

    /// Declaration of `predicate`, or the implicit default
    pub fn predicate(&self, predicate: &str) -> PredicateSchema {
        self.schema.read().resolve(predicate)
    }

    /// Highest version visible to new transactions
    pub fn current_version(&self) -> CommitTimestamp {
        self.manager.current_version()
    }

    /// Committed history of `key`, oldest first
    pub fn history(&self, key: &Key) -> Vec<VersionedValue> {
        self.store.history(key)
    }

    /// Reserve a fresh uid
    pub fn allocate_uid(&self) -> Uid {
        Uid::new(self.next_uid.fetch_add(1, Ordering::Relaxed))
    }

    /// Move the lease past an explicitly named uid
    ///
    /// Blank nodes allocated afterwards never reuse `uid`.
    pub(crate) fn reserve_uid(&self, uid: Uid) -> Result<()> {
        let next = uid.as_u64().checked_add(1).ok_or_else(|| {
            Error::InvalidInput(format!("uid {} is outside the leasable range", uid))
        })?;
        self.next_uid.fetch_max(next, Ordering::Relaxed);
        Ok(())
    }

    /// Current statistics
    pub fn metrics(&self) -> DatabaseMetrics {
        DatabaseMetrics {
            current_version: self.current_version(),
            key_count: self.store.key_count(),
            total_versions: self.store.total_versions(),
            schema_predicates: self.schema.read().len(),
            transactions: self.manager.metrics(),
        }
    }

    pub(crate) fn conflict_scope(&self) -> ConflictScope {
        self.options.conflict_scope
    }

    pub(crate) fn store(&self) -> &ShardedStore {
        &self.store
    }

    pub(crate) fn manager(&self) -> &TransactionManager {
        &self.manager
    }

    pub(crate) fn index(&self) -> &HashIndex {
        &self.index
    }

    fn reindex(&self, decl: &PredicateSchema, version: CommitTimestamp) -> Result<()> {
        let mut entries = Vec::new();
        for key in self.store.keys_for_predicate(&decl.name) {
            let uid = match &key {
                Key::Data { uid, .. } => *uid,
                Key::Index { .. } => continue,
            };
            if let Some(value) = self.store.read(&key, version)? {
                entries.push((uid, value));
            }
        }
        self.index.rebuild(&decl.name, entries, version);
        Ok(())
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("options", &self.options)
            .field("current_version", &self.current_version())
            .field("store", &self.store)
            .finish()
    }
}
