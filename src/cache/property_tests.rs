//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the store against a plain `HashMap` model and to
//! exercise its expiration rules over arbitrary keys and values.

use proptest::prelude::*;
use std::collections::HashMap;
use std::thread::sleep;
use std::time::Duration;

use crate::cache::CacheStore;

// == Test Configuration ==
const LONG_TTL: Duration = Duration::from_secs(300);

// == Strategies ==
/// Generates cache keys from a small alphabet so operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-e]{1,2}".prop_map(|s| s)
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,64}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: String, value: String },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Put { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // With no entry expiring, the store behaves exactly like a map, and the
    // hit/miss counters match what the caller observed.
    #[test]
    fn prop_matches_map_model(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let store = CacheStore::new();
        let mut model: HashMap<String, String> = HashMap::new();
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Put { key, value } => {
                    store.put(key.clone(), value.clone(), LONG_TTL).unwrap();
                    model.insert(key, value);
                }
                CacheOp::Get { key } => {
                    let got = store.get(key.as_str());
                    prop_assert_eq!(&got, &model.get(&key).cloned());
                    if got.is_some() {
                        expected_hits += 1;
                    } else {
                        expected_misses += 1;
                    }
                }
                CacheOp::Delete { key } => {
                    prop_assert_eq!(store.delete(key.as_str()), model.remove(&key).is_some());
                }
            }
            prop_assert_eq!(store.len(), model.len(), "At most one entry per key");
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_entries, store.len(), "Total entries mismatch");
    }

    #[test]
    fn prop_put_then_get(key in key_strategy(), value in value_strategy(), ttl_ms in 1_000u64..1_000_000) {
        let store = CacheStore::new();

        store.put(key.clone(), value.clone(), Duration::from_millis(ttl_ms)).unwrap();

        prop_assert_eq!(store.get(key.as_str()), Some(value.clone()));
        // Repeated reads see the same value
        prop_assert_eq!(store.get(key.as_str()), Some(value));
    }

    #[test]
    fn prop_zero_ttl_never_readable(key in key_strategy(), value in value_strategy(), existing in any::<bool>()) {
        let store = CacheStore::new();
        if existing {
            store.put(key.clone(), "old".to_string(), LONG_TTL).unwrap();
        }

        store.put(key.clone(), value, Duration::ZERO).unwrap();

        prop_assert_eq!(store.get(key.as_str()), None);
    }

    #[test]
    fn prop_delete_then_get_misses(key in key_strategy(), value in value_strategy(), present in any::<bool>()) {
        let store = CacheStore::new();
        if present {
            store.put(key.clone(), value, LONG_TTL).unwrap();
        }

        prop_assert_eq!(store.delete(key.as_str()), present);
        prop_assert_eq!(store.get(key.as_str()), None);
    }

    #[test]
    fn prop_size_non_decreasing_on_new_key(
        keys in prop::collection::hash_set(key_strategy(), 1..20)
    ) {
        let store = CacheStore::new();

        for key in keys {
            let before = store.len();
            store.put(key, String::new(), LONG_TTL).unwrap();
            prop_assert!(store.len() >= before);
        }
    }

    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec((key_strategy(), value_strategy()), 1..100),
        max_entries in 1usize..10
    ) {
        let store = CacheStore::with_capacity_limit(max_entries);

        for (key, value) in entries {
            let _ = store.put(key, value, LONG_TTL);
            prop_assert!(
                store.len() <= max_entries,
                "Cache size {} exceeds max {}",
                store.len(),
                max_entries
            );
        }
    }

    #[test]
    fn prop_purge_keeps_live_entries(keys in prop::collection::hash_set(key_strategy(), 1..20)) {
        let store = CacheStore::new();
        for key in &keys {
            store.put(key.clone(), key.clone(), LONG_TTL).unwrap();
        }

        prop_assert_eq!(store.purge_expired(), 0);
        prop_assert_eq!(store.len(), keys.len());
    }
}

// Separate proptest block with fewer cases for time-sensitive TTL tests
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    // Once the TTL elapses, reads miss whether or not a sweep has run.
    #[test]
    fn prop_ttl_expiration_behavior(key in key_strategy(), value in value_strategy()) {
        let store = CacheStore::new();

        store.put(key.clone(), value.clone(), Duration::from_millis(30)).unwrap();
        prop_assert_eq!(store.get(key.as_str()), Some(value));

        sleep(Duration::from_millis(50));

        prop_assert_eq!(store.get(key.as_str()), None);
        prop_assert!(store.is_empty(), "Expired entry should be evicted by the read");
    }

    #[test]
    fn prop_sweep_only_shrinks(
        short in prop::collection::hash_set(key_strategy(), 1..10),
        long in prop::collection::hash_set("[f-j]{1,2}", 0..10)
    ) {
        let store = CacheStore::new();
        for key in &short {
            store.put(key.clone(), 0u8, Duration::from_millis(10)).unwrap();
        }
        for key in &long {
            store.put(key.clone(), 1u8, LONG_TTL).unwrap();
        }

        sleep(Duration::from_millis(30));

        let before = store.len();
        let removed = store.purge_expired();
        prop_assert_eq!(removed, short.len());
        prop_assert_eq!(store.len(), before - removed);
        prop_assert_eq!(store.len(), long.len());
    }
}
