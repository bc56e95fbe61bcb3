//! Snapshot isolation tests
//!
//! - Read-your-writes within a transaction
//! - Nothing visible before commit, everything visible after
//! - No partial application when a commit conflicts
//! - Abort is idempotent and never undoes a commit

use crate::*;

// =============================================================================
// Read-your-writes
// =============================================================================

/// A transaction reads its own pending writes, including deletes
#[test]
fn test_read_your_writes() {
    let db = xid_db();
    let uid = Uid::new(0x10);
    let mut txn = db.new_txn();

    assert_eq!(txn.get(uid, "name").unwrap(), None);
    txn.set(uid, "name", "first").unwrap();
    assert_eq!(txn.get(uid, "name").unwrap(), Some(Value::from("first")));
    txn.set(uid, "name", "second").unwrap();
    assert_eq!(txn.get(uid, "name").unwrap(), Some(Value::from("second")));
    txn.delete(uid, "name").unwrap();
    assert_eq!(txn.get(uid, "name").unwrap(), None);
}

/// Index lookups see pending inserts of the same transaction
#[test]
fn test_index_read_your_writes() {
    let db = xid_db();
    let mut txn = db.new_txn();
    let uid = insert_xid(&mut txn, "xid-1");

    let found = txn.query_by_index("xid", "xid-1").unwrap();
    assert_eq!(found.uids().collect::<Vec<_>>(), vec![uid]);
}

// =============================================================================
// Visibility
// =============================================================================

/// Uncommitted writes are invisible to other transactions
#[test]
fn test_pending_writes_are_invisible() {
    let db = xid_db();
    let mut writer = db.new_txn();
    let uid = insert_xid(&mut writer, "xid-1");

    let reader = db.new_txn();
    assert_eq!(reader.get(uid, "xid").unwrap(), None);
    assert!(reader.query_by_index("xid", "xid-1").unwrap().is_empty());
}

/// Transactions begun after a commit see it; older snapshots don't
#[test]
fn test_post_commit_visibility() {
    let db = xid_db();
    let old_reader = db.new_txn();

    let mut writer = db.new_txn();
    let uid = insert_xid(&mut writer, "xid-1");
    let version = writer.commit().unwrap();
    assert_eq!(version, 1);

    let new_reader = db.new_txn();
    assert_eq!(new_reader.start_version(), version);
    assert_eq!(new_reader.get(uid, "xid").unwrap(), Some(Value::from("xid-1")));
    assert_eq!(new_reader.query_by_index("xid", "xid-1").unwrap().count(), 1);

    assert_eq!(old_reader.get(uid, "xid").unwrap(), None);
    assert!(old_reader.query_by_index("xid", "xid-1").unwrap().is_empty());
}

/// Every key of a commit shares its version
#[test]
fn test_commit_writes_share_one_version() {
    let db = xid_db();
    let mut txn = db.new_txn();
    txn.mutate_nquads(
        "_:a <xid> \"a\" .\n\
         _:a <name> \"Alice\" .\n\
         _:b <xid> \"b\" .\n\
         _:a <friend> _:b .",
    )
    .unwrap();
    let version = txn.commit().unwrap();
    let a = txn.uid_for("a").unwrap();

    for predicate in ["xid", "name", "friend"] {
        let history = db.engine().history(&Key::data(a, predicate));
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].version, version);
    }
}

/// A transaction that only reads commits without a new version
#[test]
fn test_read_only_commit_allocates_nothing() {
    let db = xid_db();
    let mut writer = db.new_txn();
    insert_xid(&mut writer, "xid-1");
    writer.commit().unwrap();

    let mut reader = db.new_txn();
    reader.query_by_index("xid", "xid-1").unwrap();
    assert_eq!(reader.commit().unwrap(), 1);
    assert_eq!(db.current_version(), 1);
}

// =============================================================================
// No partial application
// =============================================================================

/// A conflicting commit applies none of its writes
#[test]
fn test_conflict_applies_nothing() {
    let db = xid_db();
    let mut t1 = db.new_txn();
    let mut t2 = db.new_txn();

    let loser = insert_xid(&mut t1, "xid-1");
    t1.set(loser, "name", "loser").unwrap();
    t1.set(Uid::new(0x99), "name", "unrelated").unwrap();
    insert_xid(&mut t2, "xid-1");

    t2.commit().unwrap();
    assert!(t1.commit().unwrap_err().is_conflict());

    let reader = db.new_txn();
    assert_eq!(reader.get(loser, "xid").unwrap(), None);
    assert_eq!(reader.get(loser, "name").unwrap(), None);
    assert_eq!(reader.get(Uid::new(0x99), "name").unwrap(), None);
    assert_eq!(db.current_version(), 1);
}

/// Operations on an aborted transaction fail with InvalidState
#[test]
fn test_aborted_transaction_rejects_operations() {
    let db = xid_db();
    let mut t1 = db.new_txn();
    let mut t2 = db.new_txn();
    insert_xid(&mut t1, "xid-1");
    insert_xid(&mut t2, "xid-1");
    t2.commit().unwrap();
    t1.commit().unwrap_err();

    assert!(matches!(
        t1.set(Uid::new(1), "name", "x"),
        Err(Error::InvalidState(_))
    ));
    assert!(matches!(t1.commit(), Err(Error::InvalidState(_))));
    assert!(matches!(
        t1.mutate_nquads("_:x <name> \"y\" ."),
        Err(Error::InvalidState(_))
    ));
}

// =============================================================================
// Abort
// =============================================================================

/// Discarding twice is harmless
#[test]
fn test_discard_is_idempotent() {
    let db = xid_db();
    let mut txn = db.new_txn();
    insert_xid(&mut txn, "xid-1");

    assert!(txn.discard());
    assert!(!txn.discard());
    assert!(matches!(txn.status(), TransactionStatus::Aborted { .. }));

    let reader = db.new_txn();
    assert!(reader.query_by_index("xid", "xid-1").unwrap().is_empty());
    assert_eq!(db.metrics().transactions_aborted, 1);
}

/// Discarding after commit leaves the commit in place
#[test]
fn test_discard_after_commit_keeps_commit() {
    let db = xid_db();
    let mut txn = db.new_txn();
    let uid = insert_xid(&mut txn, "xid-1");
    let version = txn.commit().unwrap();

    assert!(!txn.discard());
    assert_eq!(txn.status(), &TransactionStatus::Committed { version });

    let reader = db.new_txn();
    assert_eq!(reader.get(uid, "xid").unwrap(), Some(Value::from("xid-1")));
}

/// Dropping an open transaction discards it
#[test]
fn test_drop_discards() {
    let db = xid_db();
    {
        let mut txn = db.new_txn();
        insert_xid(&mut txn, "xid-1");
    }
    let metrics = db.metrics();
    assert_eq!(metrics.transactions_aborted, 1);
    assert_eq!(metrics.transactions_active, 0);

    // the identifier is still free
    let mut txn = db.new_txn();
    insert_xid(&mut txn, "xid-1");
    txn.commit().unwrap();
}
