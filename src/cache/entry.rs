//! Cache Entry Module
//!
//! Defines the timed entry produced by `cache_until_expiry` initializers.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

// == Timed Entry ==
/// A value together with the instant it stops being valid.
///
/// Both fields are chosen by the initializer. The cache never computes or
/// adjusts `expiry`; it only compares it against the clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimedEntry<V> {
    /// The cached value
    pub held_value: V,
    /// Instant from which the entry is stale
    pub expiry: DateTime<Utc>,
}

impl<V> TimedEntry<V> {
    // == Constructor ==
    /// Creates an entry that is fresh until `expiry`.
    pub fn new(held_value: V, expiry: DateTime<Utc>) -> Self {
        Self { held_value, expiry }
    }

    /// Creates an entry that expires `ttl` after `now`.
    pub fn expiring_in(held_value: V, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self::new(held_value, now + ttl)
    }

    // == Is Stale ==
    /// Checks whether the entry is stale at `now`.
    ///
    /// Boundary condition: an entry is stale once `now >= expiry`, so it is
    /// already stale at the exact expiry instant.
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry
    }

    // == Time To Live ==
    /// Returns how long the entry stays fresh after `now`.
    ///
    /// # Returns
    /// - `Duration::zero()` if the entry is already stale
    /// - the remaining span otherwise
    pub fn ttl_remaining(&self, now: DateTime<Utc>) -> Duration {
        if self.expiry > now {
            self.expiry - now
        } else {
            Duration::zero()
        }
    }

    /// Applies `f` to the held value, keeping the expiry.
    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> TimedEntry<U> {
        TimedEntry {
            held_value: f(self.held_value),
            expiry: self.expiry,
        }
    }
}
