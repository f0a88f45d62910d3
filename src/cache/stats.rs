//! Cache Statistics Module
//!
//! Tracks hits, misses, expirations and failed productions.

use serde::Serialize;

// == Cache Stats ==
/// Counters describing how the named cache has been used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Calls answered from a stored value
    pub hits: u64,
    /// Calls that invoked their producer (including failed ones)
    pub misses: u64,
    /// Timed accesses that found a stale entry
    pub expirations: u64,
    /// Productions that failed and were not stored
    pub failures: u64,
    /// Permanent keys holding a value
    pub permanent_entries: usize,
    /// Timed keys holding an entry, fresh or stale
    pub timed_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Total Entries ==
    /// Entries across both namespaces.
    pub fn total_entries(&self) -> usize {
        self.permanent_entries + self.timed_entries
    }

    // == Record Hit ==
    /// Increments the hit counter.
    pub(crate) fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    /// Increments the miss counter.
    pub(crate) fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Expiration ==
    /// Increments the counter of stale timed entries found.
    pub(crate) fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    // == Record Failure ==
    /// Increments the counter of failed productions.
    pub(crate) fn record_failure(&mut self) {
        self.failures += 1;
    }

    // == Record Entries ==
    /// Counts a permanent key that has just been filled.
    pub(crate) fn record_permanent_entry(&mut self) {
        self.permanent_entries += 1;
    }

    /// Counts a timed key that has just received its first entry.
    pub(crate) fn record_timed_entry(&mut self) {
        self.timed_entries += 1;
    }
}
