use chained_hashmap::{capacity_for, fnv1a, ChainedHashMap, Error, FnvBuildHasher};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::hash::{BuildHasher, Hasher};
use std::rc::Rc;

fn counting_map<V: 'static>() -> (ChainedHashMap<V>, Rc<Cell<usize>>) {
    let calls = Rc::new(Cell::new(0));
    let c = calls.clone();
    let m = ChainedHashMap::with_cleanup(16, move |_| c.set(c.get() + 1)).expect("create");
    (m, calls)
}

#[test]
fn create_rounds_capacity() {
    let m: ChainedHashMap<i32> = ChainedHashMap::with_capacity(0).unwrap();
    assert_eq!(m.capacity(), 16);
    let m: ChainedHashMap<i32> = ChainedHashMap::with_capacity(100).unwrap();
    assert_eq!(m.capacity(), 128);
    let m: ChainedHashMap<i32> = ChainedHashMap::new();
    assert_eq!(m.capacity(), 16);
    for hint in [0, 1, 15, 16, 17, 33, 4096, 5000] {
        let c = capacity_for(hint);
        assert!(c.is_power_of_two() && c >= 16 && c >= hint);
    }
}

#[test]
fn oversized_create_is_an_allocation_error() {
    let err = ChainedHashMap::<String>::with_capacity(usize::MAX).unwrap_err();
    assert!(matches!(err, Error::Allocation(_)));
    assert!(err.to_string().starts_with("allocation failed"));
}

#[test]
fn put_get_two_keys() {
    let mut m = ChainedHashMap::new();
    m.put("a", 1).unwrap();
    m.put("b", 2).unwrap();
    assert_eq!(m.get("a"), Some(&1));
    assert_eq!(m.get("b"), Some(&2));
    assert_eq!(m.len(), 2);
    assert!(!m.is_empty());
}

#[test]
fn overwrite_calls_cleanup_once_with_old_value() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let mut m = ChainedHashMap::with_cleanup(0, move |v: i32| sink.borrow_mut().push(v)).unwrap();
    m.put("a", 1).unwrap();
    m.put("a", 2).unwrap();
    assert_eq!(*seen.borrow(), vec![1]);
    assert_eq!(m.get("a"), Some(&2));
    assert_eq!(m.len(), 1);
}

#[test]
fn remove_missing_on_empty_map() {
    let (mut m, calls) = counting_map::<i32>();
    assert!(!m.remove("missing"));
    assert!(m.is_empty());
    assert_eq!(calls.get(), 0);
}

#[test]
fn remove_present_key() {
    let (mut m, calls) = counting_map();
    m.put("a", 1).unwrap();
    m.put("b", 2).unwrap();
    assert!(m.remove("a"));
    assert_eq!(calls.get(), 1);
    assert_eq!(m.get("a"), None);
    assert_eq!(m.get("b"), Some(&2));
    assert_eq!(m.len(), 1);
}

/// 13 keys in a table of 16 sit exactly at the 0.75 threshold; all remain
/// retrievable, and the table only grows once load exceeds it.
#[test]
fn thirteen_keys_cross_the_threshold_losslessly() {
    let (mut m, calls) = counting_map();
    let keys: Vec<String> = (0..13).map(|i| format!("file-{i}.c")).collect();
    for (i, k) in keys.iter().enumerate() {
        m.put(k, i).unwrap();
    }
    assert_eq!(m.len(), 13);
    for (i, k) in keys.iter().enumerate() {
        assert_eq!(m.get(k), Some(&i));
    }
    assert_eq!(m.capacity(), 16);

    m.put("file-13.c", 13).unwrap();
    assert_eq!(m.capacity(), 32);
    for (i, k) in keys.iter().enumerate() {
        assert_eq!(m.get(k), Some(&i));
    }
    assert_eq!(calls.get(), 0, "growth must not dispose of values");
}

#[test]
fn drop_cleans_up_each_remaining_entry() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let mut m = ChainedHashMap::with_cleanup(16, move |v: i32| sink.borrow_mut().push(v)).unwrap();
    m.put("x", 10).unwrap();
    m.put("y", 20).unwrap();
    drop(m);
    let mut got = seen.borrow().clone();
    got.sort();
    assert_eq!(got, vec![10, 20]);
}

/// Every value ever handed to the map is disposed of exactly once across
/// overwrites, removals and the final drop.
#[test]
fn every_value_disposed_exactly_once() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let mut m = ChainedHashMap::with_cleanup(0, move |v: u32| sink.borrow_mut().push(v)).unwrap();

    let mut next = 0u32;
    for round in 0..5 {
        for k in 0..40 {
            m.put(&format!("k{k}"), next).unwrap();
            next += 1;
        }
        for k in (round..40).step_by(7) {
            m.remove(&format!("k{k}"));
        }
    }
    drop(m);

    let disposed = seen.borrow();
    assert_eq!(disposed.len(), next as usize);
    let unique: HashSet<u32> = disposed.iter().copied().collect();
    assert_eq!(unique.len(), next as usize);
}

#[test]
fn distinct_and_duplicate_sizes() {
    let mut m = ChainedHashMap::new();
    for i in 0..500 {
        m.put(&format!("/tmp/src/{i}.rs"), i).unwrap();
    }
    assert_eq!(m.len(), 500);
    for i in 0..100 {
        m.put(&format!("/tmp/src/{i}.rs"), i * 2).unwrap();
    }
    assert_eq!(m.len(), 500);
    assert_eq!(m.get("/tmp/src/50.rs"), Some(&100));
    assert_eq!(m.get("/tmp/src/450.rs"), Some(&450));
}

/// The default hasher digests the raw key bytes with FNV-1a.
#[test]
fn default_hasher_is_plain_fnv1a() {
    let mut h = FnvBuildHasher.build_hasher();
    h.write("src/hashmap.c".as_bytes());
    assert_eq!(h.finish(), fnv1a(b"src/hashmap.c"));
    assert_eq!(fnv1a(b"src/hashmap.c"), fnv1a(b"src/hashmap.c"));
}

#[test]
fn unicode_keys() {
    let mut m = ChainedHashMap::new();
    m.put("café", 1).unwrap();
    m.put("cafe", 2).unwrap();
    m.put("日本語", 3).unwrap();
    assert_eq!(m.get("café"), Some(&1));
    assert_eq!(m.get("cafe"), Some(&2));
    assert_eq!(m.get("日本語"), Some(&3));
}

#[test]
fn owned_values_move_in_and_out_of_cleanup() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let mut m = ChainedHashMap::with_cleanup(0, move |v: Box<String>| {
        sink.borrow_mut().push(*v);
    })
    .unwrap();
    m.put("k", Box::new("first".to_string())).unwrap();
    m.put("k", Box::new("second".to_string())).unwrap();
    m.remove("k");
    assert_eq!(*seen.borrow(), vec!["first".to_string(), "second".to_string()]);
}
