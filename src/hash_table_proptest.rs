#![cfg(test)]

// Property tests for HashTable kept inside the crate so they can check
// internal structure (chains, key-list, bucket placement) after every op.

use crate::hash_table::{HashTable, SetOutcome};
use proptest::prelude::*;
use std::cell::Cell;
use std::collections::HashMap;

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Set(usize, Vec<u8>),
    SetStatic(usize, usize),
    Get(usize),
    Delete(usize),
    Mutate(usize, u8),
    Iterate,
}

// Model value: bytes plus whether they were stored statically.
#[derive(Clone, Debug, PartialEq)]
struct Stored {
    bytes: Vec<u8>,
    is_static: bool,
}

const STATICS: [&[u8]; 3] = [b"s0", b"static-one", b""];

fn arb_scenario() -> impl Strategy<Value = (u32, Vec<Vec<u8>>, Vec<OpI>)> {
    // Keys may contain NULs and be prefixes of one another.
    let pool = proptest::collection::vec(proptest::collection::vec(0u8..4, 1..=4), 1..=24);
    (0u32..=3, pool).prop_flat_map(|(tablesize, pool)| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            3 => (idx.clone(), proptest::collection::vec(any::<u8>(), 0..6))
                .prop_map(|(i, v)| OpI::Set(i, v)),
            1 => (idx.clone(), 0..STATICS.len()).prop_map(|(i, s)| OpI::SetStatic(i, s)),
            1 => idx.clone().prop_map(OpI::Get),
            2 => idx.clone().prop_map(OpI::Delete),
            1 => (idx.clone(), any::<u8>()).prop_map(|(i, b)| OpI::Mutate(i, b)),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..120)
            .prop_map(move |ops| (tablesize, pool.clone(), ops))
    })
}

// Property: State-machine equivalence against std::collections::HashMap
// plus an insertion-ordered key list.
// Invariants exercised across random operation sequences:
// - `set`/`set_static` report Inserted iff the key was absent; len parity.
// - `get` returns the last stored bytes; `get_value` reports the static tag.
// - `delete` reports presence and removes only that key.
// - The destructor runs exactly once per owned value that is replaced or
//   deleted, never for static ones.
// - Iteration follows insertion order; updates keep the original position.
// - Chains, key-list and bucket placement stay consistent through splits.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((tablesize, pool, ops) in arb_scenario()) {
        let released = Cell::new(0usize);
        let mut expected_released = 0usize;
        let mut sut = HashTable::builder()
            .initial_tablesize(tablesize)
            .destructor(|_: &mut [u8]| released.set(released.get() + 1))
            .build()
            .unwrap();
        let mut model: HashMap<Vec<u8>, Stored> = HashMap::new();
        let mut order: Vec<Vec<u8>> = Vec::new();
        let mut last_size = sut.tablesize();

        for op in ops {
            match op {
                OpI::Set(i, v) => {
                    let k = pool[i].clone();
                    let outcome = sut.set(&k, &v).unwrap();
                    let prev = model.insert(k.clone(), Stored { bytes: v, is_static: false });
                    match prev {
                        Some(p) => {
                            prop_assert_eq!(outcome, SetOutcome::Replaced);
                            if !p.is_static { expected_released += 1; }
                        }
                        None => {
                            prop_assert_eq!(outcome, SetOutcome::Inserted);
                            order.push(k);
                        }
                    }
                }
                OpI::SetStatic(i, s) => {
                    let k = pool[i].clone();
                    let outcome = sut.set_static(&k, STATICS[s]).unwrap();
                    let prev = model.insert(k.clone(), Stored { bytes: STATICS[s].to_vec(), is_static: true });
                    match prev {
                        Some(p) => {
                            prop_assert_eq!(outcome, SetOutcome::Replaced);
                            if !p.is_static { expected_released += 1; }
                        }
                        None => {
                            prop_assert_eq!(outcome, SetOutcome::Inserted);
                            order.push(k);
                        }
                    }
                }
                OpI::Get(i) => {
                    let k = &pool[i];
                    let got = sut.get_value(k);
                    match model.get(k) {
                        Some(m) => {
                            let v = got.expect("present in model");
                            prop_assert_eq!(v.as_bytes(), &m.bytes[..]);
                            prop_assert_eq!(v.is_static(), m.is_static);
                        }
                        None => prop_assert!(got.is_none()),
                    }
                }
                OpI::Delete(i) => {
                    let k = &pool[i];
                    let removed = sut.delete(k).unwrap();
                    match model.remove(k) {
                        Some(p) => {
                            prop_assert!(removed);
                            if !p.is_static { expected_released += 1; }
                            order.retain(|o| o != k);
                        }
                        None => prop_assert!(!removed),
                    }
                    prop_assert!(!sut.contains_key(k));
                }
                OpI::Mutate(i, b) => {
                    let k = &pool[i];
                    let slot = sut.get_mut(k);
                    match model.get_mut(k) {
                        Some(m) if !m.is_static && !m.bytes.is_empty() => {
                            let s = slot.expect("owned value is writable");
                            s[0] = b;
                            m.bytes[0] = b;
                        }
                        Some(m) if m.is_static => prop_assert!(slot.is_none()),
                        Some(_) => prop_assert_eq!(slot.map(|s| s.len()), Some(0)),
                        None => prop_assert!(slot.is_none()),
                    }
                }
                OpI::Iterate => {
                    let keys: Vec<Vec<u8>> = sut.keys().map(|k| k.to_vec()).collect();
                    prop_assert_eq!(&keys, &order);
                    for (k, v) in &sut {
                        prop_assert_eq!(v, &model[k].bytes[..]);
                    }
                }
            }

            // Post-conditions after each op
            sut.assert_consistent();
            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.is_empty(), model.is_empty());
            prop_assert_eq!(released.get(), expected_released);
            prop_assert!(sut.tablesize() >= last_size, "table never shrinks");
            last_size = sut.tablesize();
        }

        let owned_left = model.values().filter(|m| !m.is_static).count();
        sut.destroy();
        prop_assert_eq!(released.get(), expected_released + owned_left);
    }
}
