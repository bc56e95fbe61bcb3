//! Concurrency tests
//!
//! Threads share one database through clones of the handle. Transactions
//! begin before a barrier so every racer reads the same snapshot.

use crate::*;
use parking_lot::Mutex;
use std::sync::{Arc, Barrier};
use std::thread;

/// Retry a transaction body until it commits
fn retry_on_conflict<F>(db: &Tessera, max_retries: u32, mut body: F) -> Result<CommitTimestamp>
where
    F: FnMut(&mut Txn<'_>) -> Result<()>,
{
    let mut last_err = None;
    for _ in 0..max_retries {
        let mut txn = db.new_txn();
        body(&mut txn)?;
        match txn.commit() {
            Ok(version) => return Ok(version),
            Err(e) if e.is_retryable() => last_err = Some(e),
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| Error::Internal("no attempts made".into())))
}

// =============================================================================
// Identifier races
// =============================================================================

/// N threads insert the same xid from a common start; exactly one wins
#[test]
fn test_xid_race_has_single_winner() {
    let db = xid_db();
    let threads = 16;
    let barrier = Arc::new(Barrier::new(threads));
    let results = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let db = db.clone();
            let barrier = Arc::clone(&barrier);
            let results = Arc::clone(&results);
            thread::spawn(move || {
                let mut txn = db.new_txn();
                let uid = insert_xid(&mut txn, "xid-1");
                barrier.wait();
                let outcome = txn.commit();
                results.lock().push((uid, outcome));
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let results = results.lock();
    let winners: Vec<Uid> = results
        .iter()
        .filter(|(_, r)| r.is_ok())
        .map(|(uid, _)| *uid)
        .collect();
    assert_eq!(winners.len(), 1);
    assert!(results
        .iter()
        .filter(|(_, r)| r.is_err())
        .all(|(_, r)| matches!(r, Err(e) if e.is_conflict())));

    let reader = db.new_txn();
    let found = reader.query_by_index("xid", "xid-1").unwrap();
    assert_eq!(found.uids().collect::<Vec<_>>(), winners);
}

/// Distinct identifiers never conflict with each other
#[test]
fn test_distinct_xids_all_commit() {
    let db = xid_db();
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let db = db.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut txn = db.new_txn();
                insert_xid(&mut txn, &format!("xid-{}", i));
                barrier.wait();
                txn.commit()
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    assert_eq!(db.current_version(), threads as u64);
    let reader = db.new_txn();
    for i in 0..threads {
        let found = reader.query_by_index("xid", format!("xid-{}", i)).unwrap();
        assert_eq!(found.count(), 1);
    }
}

// =============================================================================
// Lost updates
// =============================================================================

/// Concurrent read-modify-write increments with retry lose nothing
#[test]
fn test_counter_increments_with_retry() {
    init_tracing();
    let db = Tessera::new();
    let counter = Uid::new(1);
    let threads = 4;
    let per_thread = 25;

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let db = db.clone();
            thread::spawn(move || {
                for _ in 0..per_thread {
                    retry_on_conflict(&db, 1_000, |txn| {
                        let current = txn
                            .get(counter, "count")?
                            .and_then(|v| v.as_int())
                            .unwrap_or(0);
                        txn.set(counter, "count", current + 1)
                    })
                    .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let reader = db.new_txn();
    assert_eq!(
        reader.get(counter, "count").unwrap(),
        Some(Value::Int((threads * per_thread) as i64))
    );
    let history = db.engine().history(&Key::data(counter, "count"));
    assert_eq!(history.len(), threads * per_thread);
    assert!(history.windows(2).all(|w| w[0].version < w[1].version));
}

/// Readers running alongside writers only ever see whole commits
#[test]
fn test_readers_never_see_partial_commits() {
    init_tracing();
    let db = Tessera::new();
    let a = Uid::new(1);
    let b = Uid::new(2);
    let rounds = 200;

    thread::scope(|s| {
        s.spawn(|| {
            for i in 0..rounds {
                let mut txn = db.new_txn();
                txn.set(a, "n", i as i64).unwrap();
                txn.set(b, "n", i as i64).unwrap();
                txn.commit().unwrap();
            }
        });
        for _ in 0..3 {
            s.spawn(|| {
                for _ in 0..rounds {
                    let txn = db.new_txn();
                    let left = txn.get(a, "n").unwrap();
                    let right = txn.get(b, "n").unwrap();
                    assert_eq!(left, right);
                }
            });
        }
    });
}
