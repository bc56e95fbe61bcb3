//! Results returned to clients

use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::collections::{BTreeMap, BTreeSet};
use tessera_core::{CommitTimestamp, Uid};

/// Outcome of [`Transaction::mutate`](crate::Transaction::mutate)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MutationResponse {
    /// Blank node label → uid, for labels used by the mutation
    pub uids: BTreeMap<String, Uid>,
    /// Commit version when the mutation was sent with `commit_now`
    pub commit_version: Option<CommitTimestamp>,
}

impl MutationResponse {
    /// Uid assigned to `_:label`
    pub fn uid(&self, label: &str) -> Option<Uid> {
        self.uids.get(label).copied()
    }
}

/// Entities matching an equality lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexQuery {
    predicate: String,
    uids: BTreeSet<Uid>,
}

impl IndexQuery {
    pub(crate) fn new(predicate: impl Into<String>, uids: BTreeSet<Uid>) -> Self {
        Self {
            predicate: predicate.into(),
            uids,
        }
    }

    /// Predicate that was queried
    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    /// Number of matching entities
    pub fn count(&self) -> usize {
        self.uids.len()
    }

    /// Whether nothing matched
    pub fn is_empty(&self) -> bool {
        self.uids.is_empty()
    }

    /// Whether `uid` matched
    pub fn contains(&self, uid: Uid) -> bool {
        self.uids.contains(&uid)
    }

    /// Matching entities in uid order
    pub fn uids(&self) -> impl Iterator<Item = Uid> + '_ {
        self.uids.iter().copied()
    }

    /// Count rendered as a named query block: `{"q":[{"count":1}]}`
    pub fn to_json(&self, block: &str) -> JsonValue {
        json!({ block: [{ "count": self.count() }] })
    }

    /// Matches rendered as a named query block: `{"q":[{"uid":"0x1"}]}`
    pub fn to_uid_json(&self, block: &str) -> JsonValue {
        let rows: Vec<JsonValue> = self
            .uids
            .iter()
            .map(|uid| json!({ "uid": uid.to_string() }))
            .collect();
        json!({ block: rows })
    }
}
