use super::*;

use proptest::prelude::*;
use std::collections::BTreeMap;

fn validate_tree<V>(t: &Tree<V>) {
    let issues = t.verify_integrity();
    assert!(issues.is_empty(), "integrity issues: {:#?}", issues);
}

fn entries<V: Copy>(t: &Tree<V>) -> Vec<(Vec<u8>, V)> {
    t.iter().map(|(k, v)| (k, *v)).collect()
}

fn model_entries<V: Copy>(m: &BTreeMap<Vec<u8>, V>) -> Vec<(Vec<u8>, V)> {
    m.iter().map(|(k, v)| (k.clone(), *v)).collect()
}

#[derive(Clone, Debug)]
enum Op<V> {
    Insert(Vec<u8>, V),
    Remove(Vec<u8>),
    Get(Vec<u8>),
    RemovePrefix(Vec<u8>),
    Commit,
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // A narrow alphabet makes shared prefixes and prefix-of-another keys
    // common. 0x00, 0x01 and 0xFF are the bytes the key encoding cares about.
    let byte = prop_oneof![
        Just(0x00u8),
        Just(0x01u8),
        Just(0xFFu8),
        Just(b'a'),
        Just(b'b'),
        any::<u8>(),
    ];
    let short = prop::collection::vec(byte, 0..=8);
    let long = short
        .clone()
        .prop_map(|tail| [&b"a shared prefix well past ten bytes/"[..], tail.as_slice()].concat());
    prop_oneof![3 => short, 1 => long]
}

fn ops_strategy_u64() -> impl Strategy<Value = Vec<Op<u64>>> {
    let key = key_strategy();
    let op = prop_oneof![
        50 => (key.clone(), any::<u64>()).prop_map(|(k, v)| Op::Insert(k, v)),
        25 => key.clone().prop_map(Op::Remove),
        20 => key.clone().prop_map(Op::Get),
        2 => prop::collection::vec(prop_oneof![Just(b'a'), Just(0x00u8)], 0..=3).prop_map(Op::RemovePrefix),
        3 => Just(Op::Commit),
    ];
    prop::collection::vec(op, 0..=2000)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence_u64(ops in ops_strategy_u64()) {
        let mut txn: Txn<u64> = Tree::new().txn();
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();
        let mut snapshots: Vec<(Tree<u64>, BTreeMap<Vec<u8>, u64>)> = Vec::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let old_t = txn.insert(&key, value);
                    let old_m = m.insert(key, value);
                    prop_assert_eq!(old_t, old_m);
                }
                Op::Remove(key) => {
                    let old_t = txn.delete(&key);
                    let old_m = m.remove(key.as_slice());
                    prop_assert_eq!(old_t, old_m);
                }
                Op::Get(key) => {
                    let got_t = txn.get(&key).copied();
                    let got_m = m.get(key.as_slice()).copied();
                    prop_assert_eq!(got_t, got_m);
                }
                Op::RemovePrefix(prefix) => {
                    let before = m.len();
                    m.retain(|k, _| !k.starts_with(&prefix));
                    prop_assert_eq!(txn.delete_prefix(&prefix), before - m.len());
                }
                Op::Commit => {
                    let tree = txn.commit();
                    validate_tree(&tree);
                    snapshots.push((tree.clone(), m.clone()));
                    txn = tree.txn();
                }
            }

            prop_assert_eq!(txn.len(), m.len());
        }

        let tree = txn.commit();
        validate_tree(&tree);
        prop_assert_eq!(entries(&tree), model_entries(&m));

        // Later transactions never leak into earlier versions.
        for (snapshot, expected) in &snapshots {
            prop_assert_eq!(snapshot.len(), expected.len());
            prop_assert_eq!(entries(snapshot), model_entries(expected));
        }
    }

    #[test]
    fn prop_queries_match_model(
        keys in prop::collection::vec(key_strategy(), 0..=300),
        probes in prop::collection::vec(key_strategy(), 1..=40),
    ) {
        let tree: Tree<usize> = keys.iter().enumerate().map(|(i, k)| (k.as_slice(), i)).collect();
        let m: BTreeMap<Vec<u8>, usize> = keys.iter().cloned().enumerate().map(|(i, k)| (k, i)).collect();
        validate_tree(&tree);

        for probe in probes {
            let got = tree.longest_prefix(&probe).map(|(k, v)| (k, *v));
            let expected = m
                .iter()
                .filter(|(k, _)| probe.starts_with(k))
                .max_by_key(|(k, _)| k.len())
                .map(|(k, v)| (k.clone(), *v));
            prop_assert_eq!(got, expected);

            let got: Vec<(Vec<u8>, usize)> = tree.path_iter(&probe).map(|(k, v)| (k, *v)).collect();
            let expected: Vec<(Vec<u8>, usize)> = m
                .range(probe.clone()..)
                .take_while(|(k, _)| k.starts_with(&probe))
                .map(|(k, v)| (k.clone(), *v))
                .collect();
            prop_assert_eq!(got, expected);

            let got: Vec<Vec<u8>> = tree.range(probe.as_slice()..).map(|(k, _)| k).collect();
            let expected: Vec<Vec<u8>> = m.range(probe.clone()..).map(|(k, _)| k.clone()).collect();
            prop_assert_eq!(got, expected);

            let got: Vec<Vec<u8>> = tree.range(..=probe.as_slice()).map(|(k, _)| k).collect();
            let expected: Vec<Vec<u8>> = m.range(..=probe.clone()).map(|(k, _)| k.clone()).collect();
            prop_assert_eq!(got, expected);
        }
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

fn small_set() -> Vec<Vec<u8>> {
    vec![
        b"".to_vec(),
        b"a".to_vec(),
        b"b".to_vec(),
        b"aa".to_vec(),
        b"ab".to_vec(),
        b"a\0".to_vec(),
        b"a\0a".to_vec(),
    ]
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys = small_set();

    for_each_permutation(&keys, |perm| {
        let mut txn: Txn<u64> = Tree::new().txn();
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for (i, k) in perm.into_iter().enumerate() {
            let v = i as u64;
            assert_eq!(txn.insert(&k, v), m.insert(k, v));
        }

        let t = txn.commit();
        validate_tree(&t);
        assert_eq!(entries(&t), model_entries(&m));
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys = small_set();

    // Insert in a fixed order, then remove in all permutations.
    let mut txn: Txn<u64> = Tree::new().txn();
    let mut base_map: BTreeMap<Vec<u8>, u64> = BTreeMap::new();
    for (i, k) in keys.iter().enumerate() {
        let v = i as u64;
        assert_eq!(txn.insert(k, v), base_map.insert(k.clone(), v));
    }
    let base_tree = txn.commit();

    for_each_permutation(&keys, |perm| {
        let mut t = base_tree.clone();
        let mut m = base_map.clone();

        for k in perm {
            let (next, old) = t.delete(&k);
            assert_eq!(old, m.remove(k.as_slice()));
            assert_eq!(next.len(), m.len());
            validate_tree(&next);
            t = next;
        }
        assert_eq!(t.len(), 0);
        assert!(t.root().is_none());
        assert_eq!(base_tree.len(), keys.len());
    });
    validate_tree(&base_tree);
}
