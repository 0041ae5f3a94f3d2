use proptest::prelude::*;
use std::collections::BTreeMap;

use crate::error::Error;
use crate::table::{Store, Table};

#[derive(Clone, Debug)]
enum Op {
    Store(Vec<u8>, Vec<u8>, u8),
    Remove(Vec<u8>),
    Fetch(Vec<u8>),
    ClearSlot(u8),
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // A narrow alphabet and short keys force plenty of digest collisions,
    // which is where the chaining and reindexing logic actually lives.
    prop::collection::vec(prop_oneof![Just(97u8), Just(98), Just(130), any::<u8>()], 0..=12)
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let value = prop::collection::vec(any::<u8>(), 0..=32);
    let op = prop_oneof![
        50 => (key.clone(), value, any::<u8>()).prop_map(|(k, v, f)| Op::Store(k, v, f)),
        25 => key.clone().prop_map(Op::Remove),
        22 => key.clone().prop_map(Op::Fetch),
        3 => (0u8..16).prop_map(Op::ClearSlot),
    ];
    prop::collection::vec(op, 0..=500)
}

fn crate_digest_slot(key: &[u8]) -> u8 {
    crate::digest::Digest::of(key).symbol(0)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_model_equivalence(ops in ops_strategy(), max_chain in 1u8..=32) {
        let mut table = Table::with_config(max_chain, 1);
        let mut model: BTreeMap<Vec<u8>, (Vec<u8>, u8)> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Store(key, value, flags) => {
                    let outcome = table.store(&key, &value, flags).unwrap();
                    let old = model.insert(key, (value, flags));
                    let expected = if old.is_some() { Store::Replaced } else { Store::Added };
                    prop_assert_eq!(outcome, expected);
                }
                Op::Remove(key) => {
                    let removed = table.remove(&key);
                    match model.remove(&key) {
                        Some((value, flags)) => {
                            let removed = removed.unwrap();
                            prop_assert_eq!(&*removed.value, &value[..]);
                            prop_assert_eq!(removed.flags, flags);
                        }
                        None => prop_assert_eq!(removed.unwrap_err(), Error::NotFound),
                    }
                }
                Op::Fetch(key) => {
                    let fetched = table.fetch(&key);
                    match model.get(&key) {
                        Some((value, flags)) => {
                            let fetched = fetched.unwrap();
                            prop_assert_eq!(fetched.value, &value[..]);
                            prop_assert_eq!(fetched.flags, *flags);
                        }
                        None => prop_assert_eq!(fetched.unwrap_err(), Error::NotFound),
                    }
                }
                Op::ClearSlot(slot) => {
                    table.clear_slot(slot);
                    model.retain(|key, _| crate_digest_slot(key) != slot);
                }
            }

            prop_assert_eq!(table.len(), model.len() as u64);
        }

        table.check_invariants();

        // Traversal visits exactly the live key set, each key once.
        let visited: Vec<Vec<u8>> = table.keys().collect();
        prop_assert_eq!(visited.len(), model.len());
        let visited: std::collections::BTreeSet<Vec<u8>> = visited.into_iter().collect();
        let expected: std::collections::BTreeSet<Vec<u8>> = model.keys().cloned().collect();
        prop_assert_eq!(visited, expected);
    }

    #[test]
    fn prop_clear_matches_fresh_table(ops in ops_strategy()) {
        let mut table = Table::new();
        for op in ops {
            match op {
                Op::Store(key, value, flags) => {
                    table.store(&key, &value, flags).unwrap();
                }
                Op::Remove(key) => {
                    let _ = table.remove(&key);
                }
                Op::Fetch(key) => {
                    let _ = table.fetch(&key);
                }
                Op::ClearSlot(slot) => table.clear_slot(slot),
            }
        }
        table.clear();
        prop_assert_eq!(*table.stats(), *Table::new().stats());
        prop_assert_eq!(table.first_key(), Err(Error::Empty));
        table.check_invariants();
    }
}
