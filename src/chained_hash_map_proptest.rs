#![cfg(test)]

// Property tests for ChainedHashMap kept inside the crate so they can use a
// colliding hasher alongside the default one.

use crate::chained_hash_map::{ChainedHashMap, MIN_CAPACITY};
use crate::fnv::FnvBuildHasher;
use proptest::prelude::*;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::hash::{BuildHasher, Hasher};
use std::rc::Rc;

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Put(usize, i32),
    Get(usize),
    Remove(usize),
    Contains(String),
    Mutate(usize, i32),
    Clear,
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=40).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            6 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Put(i, v)),
            2 => idx.clone().prop_map(OpI::Get),
            2 => idx.clone().prop_map(OpI::Remove),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::Clear),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

// State-machine equivalence against std::collections::HashMap. Alongside the
// value model, the test predicts the exact sequence of disposed values.
//
// Invariants exercised after every op:
// - `get`/`contains_key` agree with the model; `len`/`is_empty` parity.
// - Overwrite and remove dispose of exactly the displaced value, once.
// - Capacity is a power of two >= 16, and load never exceeds 3/4 by more
//   than the single insertion that follows a resize check.
// - Dropping the map disposes of exactly the values still present.
fn run_state_machine<S: BuildHasher>(
    hasher: S,
    pool: Vec<String>,
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let disposed = Rc::new(RefCell::new(Vec::<i32>::new()));
    let sink = disposed.clone();
    let mut sut: ChainedHashMap<i32, S> = ChainedHashMap::with_capacity_cleanup_and_hasher(
        0,
        Some(Box::new(move |v: i32| sink.borrow_mut().push(v))),
        hasher,
    )
    .expect("minimum table allocates");
    let mut model: HashMap<String, i32> = HashMap::new();
    let mut expected_disposed: Vec<i32> = Vec::new();

    for op in ops {
        match op {
            OpI::Put(i, v) => {
                let k = &pool[i];
                sut.put(k, v).expect("put succeeds");
                if let Some(old) = model.insert(k.clone(), v) {
                    expected_disposed.push(old);
                }
            }
            OpI::Get(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.get(k), model.get(k));
            }
            OpI::Remove(i) => {
                let k = &pool[i];
                let removed = sut.remove(k);
                match model.remove(k) {
                    Some(old) => {
                        prop_assert!(removed, "present key must be removed");
                        expected_disposed.push(old);
                    }
                    None => prop_assert!(!removed, "absent key must report false"),
                }
                prop_assert!(sut.get(k).is_none());
            }
            OpI::Contains(s) => {
                prop_assert_eq!(sut.contains_key(&s), model.contains_key(&s));
            }
            OpI::Mutate(i, d) => {
                let k = &pool[i];
                match (sut.get_mut(k), model.get_mut(k)) {
                    (Some(sv), Some(mv)) => {
                        *sv = sv.wrapping_add(d);
                        *mv = mv.wrapping_add(d);
                    }
                    (None, None) => {}
                    _ => prop_assert!(false, "get_mut presence must match model"),
                }
            }
            OpI::Clear => {
                let capacity = sut.capacity();
                sut.clear();
                prop_assert_eq!(sut.capacity(), capacity);
                let fresh: Vec<i32> = disposed.borrow()[expected_disposed.len()..].to_vec();
                let mut drained: Vec<i32> = model.drain().map(|(_, v)| v).collect();
                let mut actual = fresh.clone();
                drained.sort();
                actual.sort();
                prop_assert_eq!(&actual, &drained);
                expected_disposed.extend(fresh);
            }
            OpI::Iterate => {
                let s_keys: BTreeSet<String> = sut.iter().map(|(k, _)| k.to_string()).collect();
                let m_keys: BTreeSet<String> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
                prop_assert_eq!(sut.iter().count(), model.len());
            }
        }

        prop_assert_eq!(&*disposed.borrow(), &expected_disposed);
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        let capacity = sut.capacity();
        prop_assert!(capacity.is_power_of_two() && capacity >= MIN_CAPACITY);
        prop_assert!(sut.len() <= capacity - capacity / 4 + 1);
    }

    let before_drop = disposed.borrow().len();
    drop(sut);
    let mut remaining: Vec<i32> = model.into_values().collect();
    let mut actual: Vec<i32> = disposed.borrow()[before_drop..].to_vec();
    remaining.sort();
    actual.sort();
    prop_assert_eq!(actual, remaining);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(FnvBuildHasher, pool, ops)?;
    }
}

// Collision variant using a constant hasher: every key shares one chain, so
// lookups and unlinks depend entirely on key comparison.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_state_machine(ConstBuildHasher, pool, ops)?;
    }
}

// Property: after inserting N distinct keys and re-putting M of them, size is
// N, every key maps to its last value, and every overwrite disposed of once.
proptest! {
    #[test]
    fn prop_growth_is_lossless(
        keys in proptest::collection::btree_set("[a-z0-9]{1,8}", 1..300),
        rewrites in proptest::collection::vec(any::<prop::sample::Index>(), 0..50),
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let disposed = Rc::new(RefCell::new(0usize));
        let counter = disposed.clone();
        let mut m = ChainedHashMap::with_cleanup(16, move |_: usize| *counter.borrow_mut() += 1)
            .expect("minimum table allocates");

        for (i, k) in keys.iter().enumerate() {
            m.put(k, i).expect("put succeeds");
        }
        let mut last: HashMap<&str, usize> = keys.iter().enumerate().map(|(i, k)| (k.as_str(), i)).collect();
        for (n, ix) in rewrites.iter().enumerate() {
            let k = ix.get(&keys);
            m.put(k, 10_000 + n).expect("put succeeds");
            last.insert(k.as_str(), 10_000 + n);
        }

        prop_assert_eq!(m.len(), keys.len());
        prop_assert_eq!(*disposed.borrow(), rewrites.len());
        for k in &keys {
            prop_assert_eq!(m.get(k), last.get(k.as_str()));
        }
    }
}
