#![cfg(feature = "map")]
//! Property-based tests for HashTrieMap.
//!
//! Every law is checked against `std::collections::HashMap` as the reference
//! model. Keys are hashed through a coarse hasher that sends many distinct
//! keys to the same hash, so collision nodes and shared hash prefixes show up
//! in almost every generated case.

use persistent_hamt::hamt::SizeDelta;
use persistent_hamt::map::HashTrieMap;
use proptest::prelude::*;
use std::collections::HashMap;
use std::hash::{BuildHasherDefault, Hasher};

// =============================================================================
// Coarse hashing
// =============================================================================

/// Hasher that maps every `u64` onto one of 97 spread-out hash values.
#[derive(Default)]
struct CoarseHasher {
    value: u64,
}

impl Hasher for CoarseHasher {
    fn finish(&self) -> u64 {
        self.value
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.value = self.value.rotate_left(8) ^ u64::from(byte);
        }
    }

    fn write_u64(&mut self, value: u64) {
        self.value = (value % 97).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    }
}

type CoarseMap = HashTrieMap<u64, i32, BuildHasherDefault<CoarseHasher>>;

// =============================================================================
// Strategy for generating test data
// =============================================================================

#[derive(Debug, Clone)]
enum Operation {
    Insert(u64, i32),
    Remove(u64),
    Increment(u64),
}

fn arbitrary_key() -> impl Strategy<Value = u64> {
    0..400_u64
}

fn arbitrary_operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        3 => (arbitrary_key(), any::<i32>())
            .prop_map(|(key, value)| Operation::Insert(key, value)),
        2 => arbitrary_key().prop_map(Operation::Remove),
        1 => arbitrary_key().prop_map(Operation::Increment),
    ]
}

fn arbitrary_operations() -> impl Strategy<Value = Vec<Operation>> {
    prop::collection::vec(arbitrary_operation(), 0..300)
}

fn arbitrary_entries() -> impl Strategy<Value = Vec<(u64, i32)>> {
    prop::collection::vec((arbitrary_key(), any::<i32>()), 0..200)
}

fn increment(value: Option<&i32>) -> Option<i32> {
    Some(value.map_or(0, |value| value.wrapping_add(1)))
}

fn apply(map: &CoarseMap, operation: &Operation) -> CoarseMap {
    match *operation {
        Operation::Insert(key, value) => map.insert(key, value),
        Operation::Remove(key) => map.remove(&key),
        Operation::Increment(key) => map.update_with(&key, increment),
    }
}

fn apply_to_model(model: &mut HashMap<u64, i32>, operation: &Operation) {
    match *operation {
        Operation::Insert(key, value) => {
            model.insert(key, value);
        }
        Operation::Remove(key) => {
            model.remove(&key);
        }
        Operation::Increment(key) => {
            let next = model.get(&key).map_or(0, |value| value.wrapping_add(1));
            model.insert(key, next);
        }
    }
}

fn agrees_with(map: &CoarseMap, model: &HashMap<u64, i32>) -> bool {
    map.len() == model.len()
        && model.iter().all(|(key, value)| map.get(key) == Some(value))
        && map.iter().all(|(key, value)| model.get(key) == Some(value))
}

// =============================================================================
// Model Law: any operation sequence agrees with HashMap
// =============================================================================

proptest! {
    #[test]
    fn prop_operations_agree_with_model(operations in arbitrary_operations()) {
        let mut map = CoarseMap::default();
        let mut model = HashMap::new();

        for operation in &operations {
            map = apply(&map, operation);
            apply_to_model(&mut model, operation);
            prop_assert_eq!(map.len(), model.len());
            prop_assert_eq!(map.check_invariants(), Ok(()));
        }

        prop_assert!(agrees_with(&map, &model));
    }
}

// =============================================================================
// Persistence Law: later operations never change an earlier version
// =============================================================================

proptest! {
    #[test]
    fn prop_earlier_versions_are_preserved(
        entries in arbitrary_entries(),
        operations in arbitrary_operations()
    ) {
        let snapshot: CoarseMap = entries.iter().copied().collect();
        let model: HashMap<u64, i32> = entries.into_iter().collect();

        let later = operations
            .iter()
            .fold(snapshot.clone(), |map, operation| apply(&map, operation));

        prop_assert!(agrees_with(&snapshot, &model));
        prop_assert_eq!(later.check_invariants(), Ok(()));
    }
}

// =============================================================================
// Identity Law: removing an absent key keeps the same root
// =============================================================================

proptest! {
    #[test]
    fn prop_remove_absent_is_identity(entries in arbitrary_entries(), key in arbitrary_key()) {
        let map: CoarseMap = entries.into_iter().collect();
        prop_assume!(!map.contains_key(&key));

        prop_assert!(map.remove(&key).ptr_eq(&map));
        prop_assert!(map.update_with(&key, |_| None).ptr_eq(&map));
    }
}

// =============================================================================
// Transient Law: batching in a transient equals applying each update
// =============================================================================

proptest! {
    #[test]
    fn prop_transient_equals_persistent(
        entries in arbitrary_entries(),
        operations in arbitrary_operations()
    ) {
        let base: CoarseMap = entries.into_iter().collect();

        let sequential = operations
            .iter()
            .fold(base.clone(), |map, operation| apply(&map, operation));

        let mut transient = base.clone().transient();
        for operation in &operations {
            match *operation {
                Operation::Insert(key, value) => {
                    transient.insert(key, value);
                }
                Operation::Remove(key) => {
                    transient.remove(&key);
                }
                Operation::Increment(key) => {
                    transient.update_with(&key, increment);
                }
            }
        }
        let batched = transient.persistent();

        prop_assert_eq!(&batched, &sequential);
        prop_assert_eq!(batched.check_invariants(), Ok(()));
        prop_assert_eq!(base.check_invariants(), Ok(()));
    }
}

// =============================================================================
// Size Law: the reported delta reflects whether the key was bound
// =============================================================================

proptest! {
    #[test]
    fn prop_transient_delta_matches_model(operations in arbitrary_operations()) {
        let mut transient = CoarseMap::default().transient();
        let mut model = HashMap::new();

        for operation in &operations {
            let (key, delta) = match *operation {
                Operation::Insert(key, value) => {
                    (key, transient.update_with(&key, |_| Some(value)))
                }
                Operation::Remove(key) => (key, transient.update_with(&key, |_| None)),
                Operation::Increment(key) => (key, transient.update_with(&key, increment)),
            };
            let was_bound = model.contains_key(&key);
            apply_to_model(&mut model, operation);
            let expected = match (was_bound, model.contains_key(&key)) {
                (false, true) => SizeDelta::Grew,
                (true, false) => SizeDelta::Shrunk,
                _ => SizeDelta::Unchanged,
            };
            prop_assert_eq!(delta, expected);
            prop_assert_eq!(transient.len(), model.len());
        }
    }
}
