//! Database configuration

use serde::{Deserialize, Serialize};
use tessera_core::CommitTimestamp;
use tessera_index::PredicateSchema;

/// Which predicates have their index tokens checked for conflicts
///
/// Two transactions giving different new entities the same value of an
/// indexed predicate write disjoint data keys. Only the shared index token
/// makes them collide, so narrowing the scope lets both commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictScope {
    /// Every indexed predicate
    #[default]
    AllIndexed,
    /// Only indexed predicates marked `@upsert`
    UpsertOnly,
    /// None; data keys alone are checked
    Disabled,
}

impl ConflictScope {
    /// Whether writes to `predicate` claim their index tokens
    pub fn covers(&self, predicate: &PredicateSchema) -> bool {
        match self {
            ConflictScope::AllIndexed => predicate.is_indexed(),
            ConflictScope::UpsertOnly => predicate.is_indexed() && predicate.upsert,
            ConflictScope::Disabled => false,
        }
    }
}

/// Options for [`Database`](crate::Database)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseOptions {
    /// Visible version of the empty database
    pub initial_version: CommitTimestamp,
    /// Index tokens taking part in conflict detection
    pub conflict_scope: ConflictScope,
    /// Expected number of keys, used to presize the store
    pub store_capacity: usize,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            initial_version: 0,
            conflict_scope: ConflictScope::AllIndexed,
            store_capacity: 0,
        }
    }
}

impl DatabaseOptions {
    /// Indexed values are unique among concurrent writers
    pub fn strict() -> Self {
        Self::default()
    }

    /// Only `@upsert` predicates are protected
    pub fn upsert_only() -> Self {
        Self {
            conflict_scope: ConflictScope::UpsertOnly,
            ..Self::default()
        }
    }

    /// Index tokens are never checked
    ///
    /// Concurrent inserts of the same indexed value both commit. Useful for
    /// bulk loads that guarantee uniqueness upstream.
    pub fn unchecked() -> Self {
        Self {
            conflict_scope: ConflictScope::Disabled,
            ..Self::default()
        }
    }
}
