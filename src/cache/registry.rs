//! Cache Registry Module
//!
//! Key-to-slot storage for the permanent and timed namespaces.
//!
//! The registry only hands out slots. Filling a slot and checking freshness
//! happen in `NamedCache` after the registry lock is released, so the lock is
//! never held while a producer runs.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::{Shape, TimedEntry};
use crate::error::{CacheError, Result};

/// Type-erased stored value. Each key decides its own value type.
pub(crate) type Stored = Arc<dyn Any + Send + Sync>;

// == Keyed Store ==
/// Map from cache key to a shared slot.
#[derive(Debug)]
pub(crate) struct KeyedStore<S> {
    slots: HashMap<String, Arc<S>>,
}

impl<S> KeyedStore<S> {
    pub(crate) fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    /// Returns the slot for `key`, creating it with `init` on first access.
    pub(crate) fn get_or_insert_with(&mut self, key: &str, init: impl FnOnce() -> S) -> Arc<S> {
        if let Some(slot) = self.slots.get(key) {
            return Arc::clone(slot);
        }
        let slot = Arc::new(init());
        self.slots.insert(key.to_string(), Arc::clone(&slot));
        slot
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}

// == Permanent Slot ==
/// A write-once cell for a permanent key.
///
/// Immediate producers run under a blocking cell, deferred producers under an
/// async one. Either way concurrent misses wait for the first producer and a
/// failed production leaves the cell empty.
#[derive(Debug)]
pub(crate) enum PermanentSlot {
    Immediate(once_cell::sync::OnceCell<Stored>),
    Deferred(tokio::sync::OnceCell<Stored>),
}

impl PermanentSlot {
    pub(crate) fn new(shape: Shape) -> Self {
        match shape {
            Shape::Immediate => PermanentSlot::Immediate(once_cell::sync::OnceCell::new()),
            Shape::Deferred => PermanentSlot::Deferred(tokio::sync::OnceCell::new()),
        }
    }

    pub(crate) fn shape(&self) -> Shape {
        match self {
            PermanentSlot::Immediate(_) => Shape::Immediate,
            PermanentSlot::Deferred(_) => Shape::Deferred,
        }
    }
}

// == Timed Slot ==
/// Holds the latest entry for a timed key.
///
/// The async mutex is held across the freshness check and any production,
/// which coalesces concurrent misses on the same key.
pub(crate) type TimedSlot = tokio::sync::Mutex<Option<TimedEntry<Stored>>>;

const PERMANENT: &str = "permanent";
const TIMED: &str = "timed";

// == Registry ==
/// Both namespaces, guarded together so a key can be claimed by only one.
#[derive(Debug)]
pub(crate) struct Registry {
    permanent: KeyedStore<PermanentSlot>,
    timed: KeyedStore<TimedSlot>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            permanent: KeyedStore::new(),
            timed: KeyedStore::new(),
        }
    }

    // == Permanent Slot ==
    /// Returns the permanent slot for `key`, creating it with `shape`.
    ///
    /// An existing slot keeps the shape it was created with; the caller
    /// rejects a mismatch. Fails if the key belongs to the timed namespace.
    pub(crate) fn permanent_slot(&mut self, key: &str, shape: Shape) -> Result<Arc<PermanentSlot>> {
        if self.timed.contains(key) {
            return Err(CacheError::NamespaceConflict {
                key: key.to_string(),
                existing: TIMED,
            });
        }

        Ok(self
            .permanent
            .get_or_insert_with(key, || PermanentSlot::new(shape)))
    }

    // == Timed Slot ==
    /// Returns the timed slot for `key`, creating an empty one if needed.
    pub(crate) fn timed_slot(&mut self, key: &str) -> Result<Arc<TimedSlot>> {
        if self.permanent.contains(key) {
            return Err(CacheError::NamespaceConflict {
                key: key.to_string(),
                existing: PERMANENT,
            });
        }

        Ok(self
            .timed
            .get_or_insert_with(key, || tokio::sync::Mutex::new(None)))
    }

    /// Number of keys registered in either namespace.
    pub(crate) fn len(&self) -> usize {
        self.permanent.len() + self.timed.len()
    }

    #[cfg(test)]
    pub(crate) fn permanent(&self, key: &str) -> Option<Arc<PermanentSlot>> {
        self.permanent.slots.get(key).cloned()
    }
}
