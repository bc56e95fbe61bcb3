//! Duplicate identifier scenario
//!
//! Two transactions both create an entity with `xid = "xid-1"`. Their data
//! keys differ (each gets a fresh uid), so only the index makes them
//! collide.

use crate::*;
use serde_json::json;

// =============================================================================
// Second committer loses
// =============================================================================

/// T2 commits first, T1 must conflict, and exactly one entity remains
#[test]
fn test_duplicate_xid_second_committer_conflicts() {
    let db = xid_db();

    let mut t1 = db.new_txn();
    let mut t2 = db.new_txn();
    let u1 = insert_xid(&mut t1, "xid-1");
    let u2 = insert_xid(&mut t2, "xid-1");
    assert_ne!(u1, u2);

    t2.commit().unwrap();
    let err = t1.commit().unwrap_err();
    assert!(err.is_conflict(), "expected conflict, got {err}");
    assert_eq!(
        err,
        Error::Conflict {
            keys: vec!["index(xid, s:xid-1)".to_string()]
        }
    );
    assert!(matches!(t1.status(), TransactionStatus::Aborted { .. }));

    let t3 = db.new_txn();
    let found = t3.query_by_index("xid", "xid-1").unwrap();
    assert_eq!(found.count(), 1);
    assert!(found.contains(u2));
    assert!(!found.contains(u1));
    assert_eq!(found.to_json("q"), json!({ "q": [{ "count": 1 }] }));

    let rendered: serde_json::Value =
        serde_json::from_str(&found.to_uid_json("q").to_string()).unwrap();
    assert_eq!(rendered["q"][0]["uid"], json!(u2.to_string()));
}

/// Commit order decides the winner, not begin order
#[test]
fn test_duplicate_xid_first_begun_can_win() {
    let db = xid_db();

    let mut t1 = db.new_txn();
    let mut t2 = db.new_txn();
    let u1 = insert_xid(&mut t1, "xid-1");
    insert_xid(&mut t2, "xid-1");

    t1.commit().unwrap();
    assert!(t2.commit().unwrap_err().is_conflict());

    let t3 = db.new_txn();
    let found = t3.query_by_index("xid", "xid-1").unwrap();
    assert_eq!(found.uids().collect::<Vec<_>>(), vec![u1]);
}

/// The loser retried on a fresh snapshot sees the winner and can back off
#[test]
fn test_retry_after_conflict_sees_winner() {
    let db = xid_db();

    let mut t1 = db.new_txn();
    let mut t2 = db.new_txn();
    insert_xid(&mut t1, "xid-1");
    let winner = insert_xid(&mut t2, "xid-1");
    t2.commit().unwrap();
    let err = t1.commit().unwrap_err();
    assert!(err.is_retryable());

    let mut retry = db.new_txn();
    let existing = retry.query_by_index("xid", "xid-1").unwrap();
    assert_eq!(existing.uids().next(), Some(winner));
    retry
        .mutate_nquads(&format!("<{}> <name> \"found\" .", winner))
        .unwrap();
    retry.commit().unwrap();

    let reader = db.new_txn();
    assert_eq!(
        reader.get(winner, "name").unwrap(),
        Some(Value::from("found"))
    );
}

/// Without index conflict checks both inserts commit
#[test]
fn test_duplicate_xid_without_index_conflicts() {
    init_tracing();
    let db = Tessera::builder()
        .index_conflicts(false)
        .schema("xid: string @index(hash) .")
        .build()
        .unwrap();

    let mut t1 = db.new_txn();
    let mut t2 = db.new_txn();
    insert_xid(&mut t1, "xid-1");
    insert_xid(&mut t2, "xid-1");
    t2.commit().unwrap();
    t1.commit().unwrap();

    let t3 = db.new_txn();
    let found = t3.query_by_index("xid", "xid-1").unwrap();
    assert_eq!(found.to_json("q").to_string(), r#"{"q":[{"count":2}]}"#);
}

// =============================================================================
// Explicit uids next to blank nodes
// =============================================================================

/// A blank node never takes the uid of an entity written as `<0x..>`
#[test]
fn test_blank_node_does_not_overwrite_explicit_uid() {
    let db = xid_db();

    let mut setup = db.new_txn();
    setup.mutate_nquads("<0x1> <xid> \"existing\" .").unwrap();
    setup.commit().unwrap();

    let mut txn = db.new_txn();
    let fresh = txn
        .mutate_nquads("_:new <xid> \"fresh\" .")
        .unwrap()
        .uid("new")
        .unwrap();
    assert_ne!(fresh, Uid::new(1));
    txn.commit().unwrap();

    let reader = db.new_txn();
    assert_eq!(
        reader.get(Uid::new(1), "xid").unwrap(),
        Some(Value::from("existing"))
    );
    let existing = reader.query_by_index("xid", "existing").unwrap();
    assert_eq!(existing.to_json("q"), json!({ "q": [{ "count": 1 }] }));
}

/// Explicit uids later in the same batch are reserved before blank nodes
#[test]
fn test_blank_node_skips_explicit_uids_in_same_mutation() {
    let db = xid_db();

    let mut txn = db.new_txn();
    let resp = txn
        .mutate_nquads("_:new <xid> \"a\" .\n<0x7> <xid> \"b\" .")
        .unwrap();
    let fresh = resp.uid("new").unwrap();
    assert!(fresh.as_u64() > 7);
    txn.commit().unwrap();

    let reader = db.new_txn();
    assert_eq!(reader.get(fresh, "xid").unwrap(), Some(Value::from("a")));
    assert_eq!(reader.get(Uid::new(7), "xid").unwrap(), Some(Value::from("b")));
}

// =============================================================================
// Re-setting an identifier inside one transaction
// =============================================================================

/// A value replaced before commit no longer blocks others from claiming it
#[test]
fn test_replaced_xid_is_free_for_concurrent_insert() {
    let db = xid_db();

    let mut a = db.new_txn();
    let mut b = db.new_txn();
    a.set(Uid::new(0xa), "xid", "x").unwrap();
    a.set(Uid::new(0xa), "xid", "y").unwrap();
    b.set(Uid::new(0x14), "xid", "x").unwrap();

    b.commit().unwrap();
    a.commit().unwrap();

    let reader = db.new_txn();
    let x = reader.query_by_index("xid", "x").unwrap();
    assert_eq!(x.uids().collect::<Vec<_>>(), vec![Uid::new(0x14)]);
    let y = reader.query_by_index("xid", "y").unwrap();
    assert_eq!(y.uids().collect::<Vec<_>>(), vec![Uid::new(0xa)]);
}

/// The committed value stays claimed however often it is rewritten
#[test]
fn test_rewritten_committed_xid_still_conflicts() {
    let db = xid_db();

    let mut setup = db.new_txn();
    setup.set(Uid::new(1), "xid", "x").unwrap();
    setup.commit().unwrap();

    let mut rename = db.new_txn();
    let mut claim = db.new_txn();
    rename.set(Uid::new(1), "xid", "y").unwrap();
    rename.set(Uid::new(1), "xid", "z").unwrap();
    claim.set(Uid::new(2), "xid", "x").unwrap();

    claim.commit().unwrap();
    let err = rename.commit().unwrap_err();
    assert_eq!(
        err,
        Error::Conflict {
            keys: vec!["index(xid, s:x)".to_string()]
        }
    );
}
