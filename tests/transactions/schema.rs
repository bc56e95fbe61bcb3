//! Schema behavior through the public API

use crate::*;

/// Values must match the declared type
#[test]
fn test_type_mismatch_is_rejected() {
    init_tracing();
    let db = Tessera::builder()
        .schema("age: int @index(hash) .\nname: string .")
        .build()
        .unwrap();
    let mut txn = db.new_txn();

    let err = txn.mutate_nquads("_:a <age> \"twelve\" .").unwrap_err();
    assert!(matches!(err, Error::SchemaViolation(_)), "{err}");
    let err = txn.set(Uid::new(1), "name", 5i64).unwrap_err();
    assert!(matches!(err, Error::SchemaViolation(_)), "{err}");

    txn.mutate_nquads("_:a <age> \"12\" .").unwrap();
    let a = txn.uid_for("a").unwrap();
    assert_eq!(txn.get(a, "age").unwrap(), Some(Value::Int(12)));
    assert!(txn.query_by_index("age", 12i64).unwrap().contains(a));
}

/// Malformed N-Quads are rejected without touching the transaction
#[test]
fn test_bad_nquads() {
    let db = xid_db();
    let mut txn = db.new_txn();
    let err = txn.mutate_nquads("_:a <xid> xid-1 .").unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(txn.commit().unwrap(), 0);
}

/// Only indexed predicates can be queried by value
#[test]
fn test_query_requires_index() {
    let db = xid_db();
    let txn = db.new_txn();
    assert!(matches!(
        txn.query_by_index("name", "x"),
        Err(Error::InvalidInput(_))
    ));
}

/// Adding an index later picks up existing values
#[test]
fn test_alter_indexes_existing_data() {
    init_tracing();
    let db = Tessera::new();
    let mut txn = db.new_txn();
    let uid = insert_xid(&mut txn, "xid-1");
    txn.commit().unwrap();

    db.alter("xid: string @index(hash) .").unwrap();
    let reader = db.new_txn();
    assert_eq!(
        reader.query_by_index("xid", "xid-1").unwrap().uids().collect::<Vec<_>>(),
        vec![uid]
    );

    // and protects it from now on
    let mut dup = db.new_txn();
    let mut other = db.new_txn();
    insert_xid(&mut dup, "xid-2");
    insert_xid(&mut other, "xid-2");
    dup.commit().unwrap();
    assert!(other.commit().unwrap_err().is_conflict());
}

/// drop_all forgets data and schema but keeps counting versions
#[test]
fn test_drop_all() {
    let db = xid_db();
    let mut txn = db.new_txn();
    let uid = insert_xid(&mut txn, "xid-1");
    txn.commit().unwrap();

    db.drop_all();
    assert!(db.schema().is_empty());
    let reader = db.new_txn();
    assert_eq!(reader.get(uid, "xid").unwrap(), None);
    assert!(reader.query_by_index("xid", "xid-1").is_err());

    let mut txn = db.new_txn();
    txn.set(uid, "xid", "xid-1").unwrap();
    assert_eq!(txn.commit().unwrap(), 2);
}
