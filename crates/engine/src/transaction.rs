//! Client transactions
//!
//! A [`Transaction`] wraps a [`TransactionContext`] and translates graph
//! edits into key writes. Writing a value of an indexed predicate also
//! claims the index tokens involved:
//!
//! ```text
//! set _:a <xid> "xid-1"   →   Data(0x1, xid)          = "xid-1"
//!                             Index(xid, "s:xid-1")   = 0x1
//! ```
//!
//! Two transactions inserting the same `xid` for different new entities
//! write different data keys but the same index key, so the second one to
//! commit fails with `TransactionConflict`.

use crate::database::Database;
use crate::mutation::{Edit, Mutation, Object, Subject};
use crate::response::{IndexQuery, MutationResponse};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tessera_concurrency::{TransactionContext, TransactionStatus};
use tessera_core::{CommitTimestamp, Error, Key, Result, TxnId, Uid, Value, VersionStore};
use tessera_index::{PredicateSchema, ValueType};

/// Planned change of one data key
enum Op {
    Set(Uid, PredicateSchema, Value),
    Delete(Uid, PredicateSchema, Option<Value>),
}

/// A transaction against a [`Database`]
///
/// Dropping a transaction that is still active discards it.
pub struct Transaction<'db> {
    db: &'db Database,
    ctx: TransactionContext,
    blank_nodes: FxHashMap<String, Uid>,
}

impl<'db> Transaction<'db> {
    pub(crate) fn new(db: &'db Database, ctx: TransactionContext) -> Self {
        Self {
            db,
            ctx,
            blank_nodes: FxHashMap::default(),
        }
    }

    /// Transaction id
    pub fn txn_id(&self) -> TxnId {
        self.ctx.txn_id
    }

    /// Snapshot version
    pub fn start_version(&self) -> CommitTimestamp {
        self.ctx.start_version
    }

    /// Lifecycle state
    pub fn status(&self) -> &TransactionStatus {
        self.ctx.status()
    }

    /// Whether reads and writes are still accepted
    pub fn is_active(&self) -> bool {
        self.ctx.is_active()
    }

    /// Uid assigned to `_:label` in this transaction
    pub fn uid_for(&self, label: &str) -> Option<Uid> {
        self.blank_nodes.get(label).copied()
    }

    /// Apply a batch of edits
    ///
    /// Every edit is checked against the schema before anything is
    /// buffered, so a rejected mutation leaves the transaction unchanged.
    /// With `commit_now` set the transaction is committed afterwards.
    pub fn mutate(&mut self, mutation: &Mutation) -> Result<MutationResponse> {
        self.ctx.ensure_active()?;

        // explicit uids first, so blank nodes of this batch lease past them
        for edit in mutation.set.iter().chain(&mutation.delete) {
            if let Subject::Uid(uid) = &edit.subject {
                self.db.reserve_uid(*uid)?;
            }
            if let Object::Uid(uid) = &edit.object {
                self.db.reserve_uid(*uid)?;
            }
        }

        let mut labels: BTreeMap<String, Uid> = BTreeMap::new();
        let mut ops = Vec::with_capacity(mutation.set.len() + mutation.delete.len());
        for edit in &mutation.set {
            ops.push(self.plan_set(edit, &mut labels)?);
        }
        for edit in &mutation.delete {
            ops.push(self.plan_delete(edit, &mut labels)?);
        }

        for (label, uid) in &labels {
            self.blank_nodes.entry(label.clone()).or_insert(*uid);
        }
        for op in ops {
            let applied = match op {
                Op::Set(uid, decl, value) => self.write(uid, &decl, Some(value)),
                Op::Delete(uid, decl, expected) => self.remove(uid, &decl, expected),
            };
            self.abort_on_failure(applied)?;
        }
        tracing::trace!(
            txn_id = self.ctx.txn_id,
            set = mutation.set.len(),
            delete = mutation.delete.len(),
            "mutation applied"
        );

        let commit_version = if mutation.commit_now {
            Some(self.commit()?)
        } else {
            None
        };
        Ok(MutationResponse {
            uids: labels,
            commit_version,
        })
    }

    /// Set `predicate` of `uid` to `value`
    ///
    /// A store failure while buffering aborts the transaction.
    pub fn set(&mut self, uid: Uid, predicate: &str, value: impl Into<Value>) -> Result<()> {
        self.ctx.ensure_active()?;
        let decl = self.db.predicate(predicate);
        let value = value.into();
        decl.check(&value)?;
        self.db.reserve_uid(uid)?;
        if let Value::Uid(target) = &value {
            self.db.reserve_uid(*target)?;
        }
        let written = self.write(uid, &decl, Some(value));
        self.abort_on_failure(written)
    }

    /// Remove `predicate` from `uid`
    ///
    /// A store failure while buffering aborts the transaction.
    pub fn delete(&mut self, uid: Uid, predicate: &str) -> Result<()> {
        self.ctx.ensure_active()?;
        let decl = self.db.predicate(predicate);
        self.db.reserve_uid(uid)?;
        let written = self.write(uid, &decl, None);
        self.abort_on_failure(written)
    }

    /// Value of `predicate` on `uid`, including this transaction's writes
    pub fn get(&self, uid: Uid, predicate: &str) -> Result<Option<Value>> {
        self.ctx.get(self.db.store(), &Key::data(uid, predicate))
    }

    /// Entities whose `predicate` equals `value`
    ///
    /// Reads the index at the snapshot version, overlaid with this
    /// transaction's pending writes. String values are converted to the
    /// predicate's declared type, so `"42"` matches an `int` 42.
    pub fn query_by_index(&self, predicate: &str, value: impl Into<Value>) -> Result<IndexQuery> {
        self.ctx.ensure_active()?;
        let decl = self.db.predicate(predicate);
        if !decl.is_indexed() {
            return Err(Error::InvalidInput(format!(
                "predicate {} is not indexed",
                predicate
            )));
        }

        let value = match value.into() {
            Value::String(s) if !matches!(decl.value_type, ValueType::String | ValueType::Default) => {
                convert(&decl, &s)?
            }
            other => other,
        };
        let token = value.index_token().ok_or_else(|| {
            Error::InvalidInput(format!("value {} cannot be looked up", value))
        })?;

        let mut uids = self
            .db
            .index()
            .lookup(predicate, &token, self.ctx.start_version);
        for (key, pending) in self.ctx.write_set().iter() {
            if let Key::Data { uid, predicate: p } = key {
                if p != predicate {
                    continue;
                }
                let pending_token = pending.as_ref().and_then(Value::index_token);
                if pending_token.as_deref() == Some(token.as_str()) {
                    uids.insert(*uid);
                } else {
                    uids.remove(uid);
                }
            }
        }
        Ok(IndexQuery::new(predicate, uids))
    }

    /// Commit, returning the commit version
    ///
    /// On conflict or store failure the transaction is left aborted.
    pub fn commit(&mut self) -> Result<CommitTimestamp> {
        let db = self.db;
        db.manager().commit(&mut self.ctx, db.store(), db.index())
    }

    /// Abort; returns false if the transaction had already finished
    pub fn discard(&mut self) -> bool {
        self.db.manager().abort(&mut self.ctx, "discarded")
    }

    fn subject_uid(&self, subject: &Subject, labels: &mut BTreeMap<String, Uid>) -> Uid {
        match subject {
            Subject::Uid(uid) => *uid,
            Subject::Blank(label) => self.blank_uid(label, labels),
        }
    }

    fn blank_uid(&self, label: &str, labels: &mut BTreeMap<String, Uid>) -> Uid {
        if let Some(uid) = labels.get(label) {
            return *uid;
        }
        let uid = self
            .uid_for(label)
            .unwrap_or_else(|| self.db.allocate_uid());
        labels.insert(label.to_string(), uid);
        uid
    }

    fn plan_set(&self, edit: &Edit, labels: &mut BTreeMap<String, Uid>) -> Result<Op> {
        let decl = self.db.predicate(&edit.predicate);
        let uid = self.subject_uid(&edit.subject, labels);
        let value = match &edit.object {
            Object::Literal(literal) => convert(&decl, literal)?,
            Object::Uid(target) => Value::Uid(*target),
            Object::Blank(label) => Value::Uid(self.blank_uid(label, labels)),
            Object::Star => {
                return Err(Error::InvalidInput(format!(
                    "'*' cannot be set on predicate {}",
                    edit.predicate
                )))
            }
        };
        decl.check(&value)?;
        Ok(Op::Set(uid, decl, value))
    }

    fn plan_delete(&self, edit: &Edit, labels: &mut BTreeMap<String, Uid>) -> Result<Op> {
        let decl = self.db.predicate(&edit.predicate);
        let uid = self.subject_uid(&edit.subject, labels);
        let expected = match &edit.object {
            Object::Star => None,
            Object::Literal(literal) => Some(convert(&decl, literal)?),
            Object::Uid(target) => Some(Value::Uid(*target)),
            Object::Blank(label) => Some(Value::Uid(self.blank_uid(label, labels))),
        };
        Ok(Op::Delete(uid, decl, expected))
    }

    /// Delete unless `expected` is given and differs from the current value
    fn remove(&mut self, uid: Uid, decl: &PredicateSchema, expected: Option<Value>) -> Result<()> {
        if let Some(expected) = expected {
            let current = self.ctx.get(self.db.store(), &Key::data(uid, &decl.name))?;
            if current.as_ref() != Some(&expected) {
                return Ok(());
            }
        }
        self.write(uid, decl, None)
    }

    /// Buffer a data write and the index claims it implies
    ///
    /// Claims cover the committed token at the snapshot and the new token.
    /// A token claimed only for an earlier pending value of the same key is
    /// released, unless another pending write of the predicate still needs it.
    fn write(&mut self, uid: Uid, decl: &PredicateSchema, value: Option<Value>) -> Result<()> {
        let key = Key::data(uid, &decl.name);

        if self.db.conflict_scope().covers(decl) {
            let old_token = self.snapshot_token(&key)?;
            let new_token = value.as_ref().and_then(Value::index_token);

            let replaced = match self.ctx.pending(&key) {
                Some(Some(pending)) => pending.index_token(),
                _ => None,
            };
            if let Some(stale) = replaced {
                let kept = old_token.as_ref() == Some(&stale)
                    || new_token.as_ref() == Some(&stale);
                if !kept && !self.claimed_elsewhere(&key, &stale)? {
                    self.ctx.forget(&Key::index(&decl.name, stale))?;
                }
            }

            for token in old_token.into_iter().chain(new_token) {
                self.ctx
                    .put(Key::index(&decl.name, token), Value::Uid(uid))?;
            }
        }

        match value {
            Some(value) => self.ctx.put(key, value),
            None => self.ctx.delete(key),
        }
    }

    /// Index token of `key` as committed at the snapshot
    fn snapshot_token(&self, key: &Key) -> Result<Option<String>> {
        let committed = self.db.store().read(key, self.ctx.start_version)?;
        Ok(committed.as_ref().and_then(Value::index_token))
    }

    /// Whether a pending write to another key of the same predicate claims `token`
    fn claimed_elsewhere(&self, key: &Key, token: &str) -> Result<bool> {
        let predicate = match key {
            Key::Data { predicate, .. } => predicate,
            Key::Index { .. } => return Ok(false),
        };
        for (other, pending) in self.ctx.write_set().iter() {
            match other {
                Key::Data { predicate: p, .. } if p == predicate && other != key => {}
                _ => continue,
            }
            let pending_token = pending.as_ref().and_then(Value::index_token);
            if pending_token.as_deref() == Some(token)
                || self.snapshot_token(other)?.as_deref() == Some(token)
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Abort when buffering failed, keeping the error
    fn abort_on_failure<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if !matches!(e, Error::InvalidState(_)) {
                self.db
                    .manager()
                    .abort(&mut self.ctx, format!("write failed: {}", e));
            }
        }
        result
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.ctx.is_active() {
            self.discard();
        }
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("ctx", &self.ctx)
            .field("blank_nodes", &self.blank_nodes.len())
            .finish()
    }
}

fn convert(decl: &PredicateSchema, literal: &str) -> Result<Value> {
    decl.value_type.convert_literal(literal).ok_or_else(|| {
        Error::SchemaViolation(format!(
            "cannot use {:?} as {} for predicate {}",
            literal,
            decl.value_type.as_str(),
            decl.name
        ))
    })
}
