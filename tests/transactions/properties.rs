//! Randomized commit orders checked against a reference model
//!
//! A batch of transactions begins on the same snapshot, each writing a few
//! keys, then they commit in a random order. First-committer-wins means a
//! transaction commits iff none of its keys was written by an earlier
//! winner of the same batch.

use crate::*;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

const KEYS: u64 = 6;

#[derive(Debug, Clone)]
struct Plan {
    /// Uids written by each transaction (predicate `v`)
    writes: Vec<BTreeSet<u64>>,
    /// Commit order, a permutation of transaction indexes
    order: Vec<usize>,
}

fn plan() -> impl Strategy<Value = Plan> {
    prop::collection::vec(prop::collection::btree_set(1..=KEYS, 0..4), 1..8)
        .prop_flat_map(|writes| {
            let n = writes.len();
            (Just(writes), Just((0..n).collect::<Vec<_>>()).prop_shuffle())
        })
        .prop_map(|(writes, order)| Plan { writes, order })
}

/// Run one batch; returns per-transaction outcome in commit order
fn run_batch(db: &Tessera, batch: usize, plan: &Plan) -> Vec<(usize, bool)> {
    let mut txns: Vec<Txn<'_>> = plan.writes.iter().map(|_| db.new_txn()).collect();
    for (i, keys) in plan.writes.iter().enumerate() {
        for key in keys {
            let tag = format!("b{}-t{}", batch, i);
            txns[i].set(Uid::new(*key), "v", tag).unwrap();
        }
    }

    plan.order
        .iter()
        .map(|&i| match txns[i].commit() {
            Ok(_) => (i, true),
            Err(e) => {
                assert!(e.is_conflict(), "unexpected error {e}");
                (i, false)
            }
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn first_committer_wins_matches_model(plans in prop::collection::vec(plan(), 1..4)) {
        let db = Tessera::new();
        // last writer tag per uid according to the model
        let mut expected: BTreeMap<u64, String> = BTreeMap::new();
        let mut expected_version = 0;

        for (batch, plan) in plans.iter().enumerate() {
            let outcomes = run_batch(&db, batch, plan);

            let mut claimed: BTreeSet<u64> = BTreeSet::new();
            for (i, committed) in outcomes {
                let keys = &plan.writes[i];
                let model_commits = keys.is_disjoint(&claimed);
                prop_assert_eq!(committed, model_commits, "txn {} of batch {}", i, batch);
                if model_commits && !keys.is_empty() {
                    expected_version += 1;
                    claimed.extend(keys.iter().copied());
                    for key in keys {
                        expected.insert(*key, format!("b{}-t{}", batch, i));
                    }
                }
            }
        }

        prop_assert_eq!(db.current_version(), expected_version);

        let reader = db.new_txn();
        for key in 1..=KEYS {
            let got = reader.get(Uid::new(key), "v").unwrap();
            prop_assert_eq!(got, expected.get(&key).map(|tag| Value::from(tag.as_str())));

            let history = db.engine().history(&Key::data(Uid::new(key), "v"));
            prop_assert!(history.windows(2).all(|w| w[0].version < w[1].version));
        }
    }
}
