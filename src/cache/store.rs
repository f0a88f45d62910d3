//! Named Cache Store Module
//!
//! The cache service: permanent and expiring memoization keyed by name.

use std::any::type_name;
use std::future::{self, Future};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::cache::registry::{PermanentSlot, Registry, Stored};
use crate::cache::{CacheStats, Clock, Shape, SystemClock, TimedEntry};
use crate::config::Config;
use crate::error::{CacheError, Result};

// == Named Cache ==
/// Memoizes producer results under caller-chosen names.
///
/// Construct one per process and share it as `Arc<NamedCache>`. Two
/// namespaces are available:
/// - permanent (`cache`, `cache_async`): the first successful production is
///   kept for the lifetime of the service
/// - timed (`cache_until_expiry`, `cache_until_expiry_async`): the
///   initializer supplies its own expiry and runs again once it has passed
///
/// Producers run at most once per miss. Concurrent misses on one key wait
/// for the production already in flight instead of starting their own.
#[derive(Debug)]
pub struct NamedCache {
    /// Key-to-slot storage for both namespaces
    registry: Mutex<Registry>,
    /// Usage counters
    stats: Mutex<CacheStats>,
    /// Source of "now" for expiry checks
    clock: Arc<dyn Clock>,
    /// Maximum key length in bytes
    max_key_length: usize,
    /// Productions at least this slow are logged as warnings
    slow_production_threshold: Duration,
}

impl NamedCache {
    // == Constructors ==
    /// Creates a cache with default settings and the system clock.
    pub fn new() -> Self {
        Self::from_config(&Config::default())
    }

    /// Creates a cache from configuration, using the system clock.
    pub fn from_config(config: &Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a cache that reads time from `clock`.
    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Self {
        info!(
            "Named cache initialized: max_key_length={}, slow_production_threshold={}ms",
            config.max_key_length,
            config.slow_production_threshold.as_millis()
        );

        Self {
            registry: Mutex::new(Registry::new()),
            stats: Mutex::new(CacheStats::new()),
            clock,
            max_key_length: config.max_key_length,
            slow_production_threshold: config.slow_production_threshold,
        }
    }

    // == Permanent: Immediate ==
    /// Returns the value cached under `name`, producing it on first use.
    ///
    /// `producer` is only invoked on a miss. If it fails, nothing is stored
    /// and the error is returned; the next call tries again.
    ///
    /// Concurrent callers on a miss block until the first producer finishes,
    /// so slow producers called from async code belong in [`cache_async`].
    ///
    /// [`cache_async`]: NamedCache::cache_async
    pub fn cache<V, F>(&self, name: &str, producer: F) -> Result<Arc<V>>
    where
        V: Send + Sync + 'static,
        F: FnOnce() -> anyhow::Result<V>,
    {
        self.validate_key(name)?;
        let slot = self.registry.lock().permanent_slot(name, Shape::Immediate)?;
        let cell = match slot.as_ref() {
            PermanentSlot::Immediate(cell) => cell,
            other => return Err(shape_mismatch(name, other.shape(), Shape::Immediate)),
        };

        let mut produced = false;
        let started = Instant::now();
        let result = cell.get_or_try_init(|| {
            produced = true;
            producer().map(|value| Arc::new(value) as Stored)
        });

        self.settle_permanent(name, produced, started, result)
    }

    // == Permanent: Deferred ==
    /// Async counterpart of [`cache`] for producers that return a future.
    ///
    /// The future is awaited on a miss and only its resolved value is stored,
    /// so a hit never suspends.
    ///
    /// [`cache`]: NamedCache::cache
    pub async fn cache_async<V, F, Fut>(&self, name: &str, producer: F) -> Result<Arc<V>>
    where
        V: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>>,
    {
        self.validate_key(name)?;
        let slot = self.registry.lock().permanent_slot(name, Shape::Deferred)?;
        let cell = match slot.as_ref() {
            PermanentSlot::Deferred(cell) => cell,
            other => return Err(shape_mismatch(name, other.shape(), Shape::Deferred)),
        };

        let produced_flag = AtomicBool::new(false);
        let produced = &produced_flag;
        let started = Instant::now();
        let result = cell
            .get_or_try_init(move || async move {
                produced.store(true, Ordering::Relaxed);
                producer().await.map(|value| Arc::new(value) as Stored)
            })
            .await;

        let produced = produced_flag.load(Ordering::Relaxed);
        self.settle_permanent(name, produced, started, result)
    }

    /// Records the outcome of a permanent lookup.
    ///
    /// A hit only counts once the stored value has the requested type.
    fn settle_permanent<V: Send + Sync + 'static>(
        &self,
        name: &str,
        produced: bool,
        started: Instant,
        result: std::result::Result<&Stored, anyhow::Error>,
    ) -> Result<Arc<V>> {
        match result {
            Ok(stored) if produced => {
                {
                    let mut stats = self.stats.lock();
                    stats.record_miss();
                    stats.record_permanent_entry();
                }
                self.log_production(name, started);
                downcast(name, Arc::clone(stored))
            }
            Ok(stored) => {
                let value = downcast(name, Arc::clone(stored))?;
                self.stats.lock().record_hit();
                debug!(key = name, "permanent cache hit");
                Ok(value)
            }
            Err(err) => {
                {
                    let mut stats = self.stats.lock();
                    stats.record_miss();
                    stats.record_failure();
                }
                debug!(key = name, error = %err, "permanent production failed");
                Err(CacheError::Production(err))
            }
        }
    }

    // == Timed: Immediate ==
    /// Returns the entry cached under `name` while it is fresh.
    ///
    /// Always async, whatever the initializer's shape, because freshness is
    /// decided on the stored entry. See [`cache_until_expiry_async`].
    ///
    /// [`cache_until_expiry_async`]: NamedCache::cache_until_expiry_async
    pub async fn cache_until_expiry<V, F>(
        &self,
        name: &str,
        initializer: F,
    ) -> Result<TimedEntry<Arc<V>>>
    where
        V: Send + Sync + 'static,
        F: FnOnce() -> anyhow::Result<TimedEntry<V>>,
    {
        self.cache_until_expiry_async(name, || future::ready(initializer()))
            .await
    }

    // == Timed: Deferred ==
    /// Returns the entry cached under `name`, re-running `initializer` once
    /// the stored expiry has passed.
    ///
    /// # Behavior
    /// - No entry yet: run the initializer and store its entry
    /// - Fresh (`now < expiry`): return the stored entry unchanged
    /// - Stale (`now >= expiry`): run the initializer and replace the entry
    ///
    /// A failing initializer leaves any previous entry in place and returns
    /// the error. The entry returned on success may already be stale if the
    /// initializer chose an expiry in the past.
    pub async fn cache_until_expiry_async<V, F, Fut>(
        &self,
        name: &str,
        initializer: F,
    ) -> Result<TimedEntry<Arc<V>>>
    where
        V: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<TimedEntry<V>>>,
    {
        self.validate_key(name)?;
        let slot = self.registry.lock().timed_slot(name)?;
        let mut current = slot.lock().await;

        let now = self.clock.now();
        match &*current {
            Some(entry) if !entry.is_stale_at(now) => {
                let held_value = downcast(name, Arc::clone(&entry.held_value))?;
                self.stats.lock().record_hit();
                debug!(key = name, expiry = %entry.expiry, "timed cache hit");
                return Ok(TimedEntry::new(held_value, entry.expiry));
            }
            Some(entry) => {
                // A stale entry still fixes the key's value type
                if !entry.held_value.is::<V>() {
                    return Err(type_mismatch::<V>(name));
                }
                self.stats.lock().record_expiration();
                debug!(key = name, expiry = %entry.expiry, now = %now, "timed entry is stale");
            }
            None => {}
        }

        self.stats.lock().record_miss();
        let started = Instant::now();
        let produced = match initializer().await {
            Ok(entry) => entry,
            Err(err) => {
                self.stats.lock().record_failure();
                debug!(key = name, error = %err, "timed production failed, previous entry kept");
                return Err(CacheError::Production(err));
            }
        };
        self.log_production(name, started);

        if current.is_none() {
            self.stats.lock().record_timed_entry();
        }

        let entry = produced.map(Arc::new);
        *current = Some(entry.clone().map(|value| value as Stored));
        Ok(entry)
    }

    // == Stats ==
    /// Returns a snapshot of the usage counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.lock().clone()
    }

    // == Length ==
    /// Returns the number of keys registered in either namespace.
    ///
    /// A key is registered on first use, even if its production failed.
    pub fn len(&self) -> usize {
        self.registry.lock().len()
    }

    // == Is Empty ==
    /// Returns true if no key has been used yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn validate_key(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(CacheError::InvalidKey("Key cannot be empty".to_string()));
        }
        if name.len() > self.max_key_length {
            return Err(CacheError::InvalidKey(format!(
                "Key exceeds maximum length of {} bytes",
                self.max_key_length
            )));
        }
        Ok(())
    }

    fn log_production(&self, name: &str, started: Instant) {
        let elapsed = started.elapsed();
        if elapsed >= self.slow_production_threshold {
            warn!(
                key = name,
                elapsed_ms = elapsed.as_millis() as u64,
                "slow cache production"
            );
        } else {
            debug!(
                key = name,
                elapsed_ms = elapsed.as_millis() as u64,
                "cache miss, value produced"
            );
        }
    }
}

impl Default for NamedCache {
    fn default() -> Self {
        Self::new()
    }
}

fn shape_mismatch(name: &str, stored: Shape, requested: Shape) -> CacheError {
    CacheError::ShapeMismatch {
        key: name.to_string(),
        stored,
        requested,
    }
}

fn type_mismatch<V: 'static>(name: &str) -> CacheError {
    CacheError::TypeMismatch {
        key: name.to_string(),
        expected: type_name::<V>(),
    }
}

fn downcast<V: Send + Sync + 'static>(name: &str, stored: Stored) -> Result<Arc<V>> {
    stored.downcast::<V>().map_err(|_| type_mismatch::<V>(name))
}
