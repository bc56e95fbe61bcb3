//! Versioned equality index
//!
//! Maps `(predicate, token)` to the set of entities holding that value,
//! keeping one posting snapshot per commit that changed it. Lookups at a
//! version see exactly the commits the version store shows at that version.
//!
//! The index is fed from inside the commit section through
//! [`CommitObserver`], so it never runs ahead of or behind the store.

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use tessera_core::{AppliedWrite, CommitObserver, CommitTimestamp, Key, Uid, Value};

type PostingKey = (String, String);

/// Posting list history of one token
#[derive(Debug, Default)]
struct PostingHistory {
    /// `(version, members)`, strictly increasing versions
    snapshots: Vec<(CommitTimestamp, BTreeSet<Uid>)>,
}

impl PostingHistory {
    fn at(&self, as_of: CommitTimestamp) -> Option<&BTreeSet<Uid>> {
        let idx = self.snapshots.partition_point(|(v, _)| *v <= as_of);
        idx.checked_sub(1).map(|i| &self.snapshots[i].1)
    }

    fn latest(&self) -> BTreeSet<Uid> {
        self.snapshots
            .last()
            .map(|(_, members)| members.clone())
            .unwrap_or_default()
    }

    fn record(&mut self, version: CommitTimestamp, members: BTreeSet<Uid>) {
        match self.snapshots.last_mut() {
            Some((last, existing)) if *last == version => *existing = members,
            _ => self.snapshots.push((version, members)),
        }
    }
}

/// Hash index over every tracked predicate
#[derive(Debug, Default)]
pub struct HashIndex {
    tracked: RwLock<FxHashSet<String>>,
    postings: RwLock<FxHashMap<PostingKey, PostingHistory>>,
}

impl HashIndex {
    /// Create an index tracking nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `predicate` is maintained by this index
    pub fn is_tracked(&self, predicate: &str) -> bool {
        self.tracked.read().contains(predicate)
    }

    /// Rebuild the postings of `predicate` from its live values at `version`
    ///
    /// Lookups below `version` see nothing for this predicate afterwards.
    /// Must not race with commits.
    pub fn rebuild<I>(&self, predicate: &str, entries: I, version: CommitTimestamp)
    where
        I: IntoIterator<Item = (Uid, Value)>,
    {
        let mut grouped: FxHashMap<String, BTreeSet<Uid>> = FxHashMap::default();
        for (uid, value) in entries {
            if let Some(token) = value.index_token() {
                grouped.entry(token).or_default().insert(uid);
            }
        }

        let mut postings = self.postings.write();
        postings.retain(|(p, _), _| p != predicate);
        let tokens = grouped.len();
        for (token, members) in grouped {
            let mut history = PostingHistory::default();
            history.record(version, members);
            postings.insert((predicate.to_string(), token), history);
        }
        self.tracked.write().insert(predicate.to_string());

        tracing::debug!(predicate, version, tokens, "index rebuilt");
    }

    /// Stop maintaining `predicate` and drop its postings
    pub fn untrack(&self, predicate: &str) {
        self.tracked.write().remove(predicate);
        self.postings.write().retain(|(p, _), _| p != predicate);
    }

    /// Forget everything
    pub fn clear(&self) {
        self.tracked.write().clear();
        self.postings.write().clear();
    }

    /// Entities whose `predicate` equals the value behind `token` at `as_of`
    pub fn lookup(&self, predicate: &str, token: &str, as_of: CommitTimestamp) -> BTreeSet<Uid> {
        self.postings
            .read()
            .get(&(predicate.to_string(), token.to_string()))
            .and_then(|history| history.at(as_of).cloned())
            .unwrap_or_default()
    }

    /// Number of distinct tokens held for `predicate`
    pub fn token_count(&self, predicate: &str) -> usize {
        self.postings
            .read()
            .keys()
            .filter(|(p, _)| p == predicate)
            .count()
    }
}

impl CommitObserver for HashIndex {
    fn on_commit(&self, writes: &[AppliedWrite], version: CommitTimestamp) {
        let tracked = self.tracked.read();
        let mut postings = self.postings.write();
        // Working copies, recorded once per touched token
        let mut changed: FxHashMap<PostingKey, BTreeSet<Uid>> = FxHashMap::default();

        for write in writes {
            let (uid, predicate) = match &write.key {
                Key::Data { uid, predicate } if tracked.contains(predicate) => (*uid, predicate),
                _ => continue,
            };
            let old_token = write.previous.as_ref().and_then(Value::index_token);
            let new_token = write.current.as_ref().and_then(Value::index_token);
            if old_token == new_token {
                continue;
            }

            if let Some(token) = old_token {
                let key = (predicate.clone(), token);
                let members = changed.entry(key.clone()).or_insert_with(|| {
                    postings.get(&key).map(PostingHistory::latest).unwrap_or_default()
                });
                members.remove(&uid);
            }
            if let Some(token) = new_token {
                let key = (predicate.clone(), token);
                let members = changed.entry(key.clone()).or_insert_with(|| {
                    postings.get(&key).map(PostingHistory::latest).unwrap_or_default()
                });
                members.insert(uid);
            }
        }

        for (key, members) in changed {
            postings.entry(key).or_default().record(version, members);
        }
    }
}
