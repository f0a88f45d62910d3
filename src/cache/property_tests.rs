//! Property-Based Tests for Cache Module
//!
//! Uses proptest to verify the hit, miss and expiry properties of the named cache.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::cache::{Clock, ManualClock, NamedCache, TimedEntry};
use crate::config::Config;
use crate::error::CacheError;

// == Strategies ==
/// Generates valid cache keys (non-empty, within length limit)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,64}".prop_map(|s| s)
}

/// Generates cached values
fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,256}".prop_map(|s| s)
}

/// Generates TTLs in milliseconds
fn ttl_ms_strategy() -> impl Strategy<Value = i64> {
    1i64..100_000
}

/// A permanent cache call whose producer either succeeds or fails
#[derive(Debug, Clone)]
enum CacheOp {
    Produce { key: String, value: u32 },
    Fail { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    // Small key space so that keys repeat
    let key = "[a-d]";
    prop_oneof![
        (key, any::<u32>()).prop_map(|(key, value)| CacheOp::Produce { key, value }),
        key.prop_map(|key| CacheOp::Fail { key }),
    ]
}

fn manual_cache() -> (NamedCache, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let cache = NamedCache::with_clock(&Config::default(), clock.clone());
    (cache, clock)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Permanent, immediate: the second producer never runs and the first
    // value is returned both times.
    #[test]
    fn prop_permanent_immediate_hit(
        key in valid_key_strategy(),
        first in valid_value_strategy(),
        second in valid_value_strategy()
    ) {
        let cache = NamedCache::new();
        let calls = AtomicUsize::new(0);

        let a = cache.cache(&key, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(first.clone())
        }).unwrap();
        let b = cache.cache(&key, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(second.clone())
        }).unwrap();

        prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
        prop_assert_eq!(&*a, &first);
        prop_assert_eq!(&*b, &first);
    }

    // Permanent, deferred: same as above through the async entry point,
    // with a rejecting second producer.
    #[test]
    fn prop_permanent_deferred_hit(
        key in valid_key_strategy(),
        value in valid_value_strategy()
    ) {
        let cache = NamedCache::new();

        let (a, b) = tokio_test::block_on(async {
            let expected = value.clone();
            let a = cache
                .cache_async(&key, || async move { Ok(expected) })
                .await;
            let b = cache
                .cache_async::<String, _, _>(&key, || async {
                    Err(anyhow::anyhow!("rejected"))
                })
                .await;
            (a, b)
        });

        let a = a.unwrap();
        let b = b.unwrap();
        prop_assert_eq!(a.as_str(), value.as_str());
        prop_assert_eq!(b.as_str(), value.as_str());
    }

    // Failures are never cached: after any number of failed productions the
    // next successful one is stored.
    #[test]
    fn prop_failure_not_cached(
        key in valid_key_strategy(),
        failures in 1usize..5,
        value in any::<u64>()
    ) {
        let cache = NamedCache::new();

        for _ in 0..failures {
            let result = cache.cache::<u64, _>(&key, || Err(anyhow::anyhow!("down")));
            prop_assert!(matches!(result, Err(CacheError::Production(_))));
        }

        let stored = cache.cache(&key, || Ok(value)).unwrap();
        prop_assert_eq!(*stored, value);
        prop_assert_eq!(cache.stats().failures, failures as u64);
    }

    // Statistics follow a model of which keys have been filled.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let cache = NamedCache::new();
        let mut filled: HashSet<String> = HashSet::new();
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;
        let mut expected_failures: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Produce { key, value } => {
                    let result = cache.cache(&key, || Ok(value));
                    prop_assert!(result.is_ok());
                    if filled.contains(&key) {
                        expected_hits += 1;
                    } else {
                        expected_misses += 1;
                        filled.insert(key);
                    }
                }
                CacheOp::Fail { key } => {
                    let result = cache.cache::<u32, _>(&key, || Err(anyhow::anyhow!("fail")));
                    if filled.contains(&key) {
                        prop_assert!(result.is_ok(), "Filled key must not re-run its producer");
                        expected_hits += 1;
                    } else {
                        prop_assert!(result.is_err());
                        expected_misses += 1;
                        expected_failures += 1;
                    }
                }
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.failures, expected_failures, "Failures mismatch");
        prop_assert_eq!(stats.permanent_entries, filled.len(), "Entries mismatch");
    }

    // Timed, fresh: any access strictly before expiry returns the identical
    // entry and repeated hits leave it unchanged.
    #[test]
    fn prop_timed_fresh_is_stable(
        key in valid_key_strategy(),
        value in valid_value_strategy(),
        ttl_ms in ttl_ms_strategy(),
        offsets in prop::collection::vec(0.0f64..1.0, 1..10)
    ) {
        let (cache, clock) = manual_cache();
        let start = clock.now();
        let ttl = Duration::milliseconds(ttl_ms);

        let result: Result<(), TestCaseError> = tokio_test::block_on(async {
            let original = cache
                .cache_until_expiry(&key, || Ok(TimedEntry::expiring_in(value.clone(), start, ttl)))
                .await
                .unwrap();

            for fraction in offsets {
                let offset = ((ttl_ms - 1) as f64 * fraction) as i64;
                clock.set(start + Duration::milliseconds(offset));

                let hit = cache
                    .cache_until_expiry::<String, _>(&key, || Err(anyhow::anyhow!("must not run")))
                    .await
                    .unwrap();
                prop_assert_eq!(&hit, &original);
                prop_assert_eq!(&*hit.held_value, &value);
            }
            Ok(())
        });
        result?;
    }

    // Timed, stale: any access at or after expiry runs the new initializer.
    #[test]
    fn prop_timed_stale_reproduces(
        key in valid_key_strategy(),
        ttl_ms in ttl_ms_strategy(),
        late_ms in 0i64..100_000
    ) {
        let (cache, clock) = manual_cache();
        let start = clock.now();
        let ttl = Duration::milliseconds(ttl_ms);

        let (first, second) = tokio_test::block_on(async {
            let first = cache
                .cache_until_expiry(&key, || Ok(TimedEntry::expiring_in(1u32, start, ttl)))
                .await
                .unwrap();

            clock.set(first.expiry + Duration::milliseconds(late_ms));
            let now = clock.now();
            let second = cache
                .cache_until_expiry(&key, || Ok(TimedEntry::expiring_in(2u32, now, ttl)))
                .await
                .unwrap();
            (first, second)
        });

        prop_assert_eq!(*second.held_value, 2);
        prop_assert!(second.expiry > first.expiry);
    }
}

// == Unit Tests for Edge Cases ==
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_boundary_choice_is_stable() {
        // Repeated runs must agree: stale at the expiry instant every time
        for _ in 0..20 {
            let (cache, clock) = manual_cache();
            let expiry = clock.now() + Duration::seconds(2);

            cache
                .cache_until_expiry("edge", || Ok(TimedEntry::new(1u8, expiry)))
                .await
                .unwrap();

            clock.set(expiry);
            let at = cache
                .cache_until_expiry("edge", || Ok(TimedEntry::new(2u8, expiry + Duration::seconds(2))))
                .await
                .unwrap();
            assert_eq!(*at.held_value, 2);
        }
    }
}
