/// Compiled-unit cache
///
/// Process-wide mapping from identity key to compiled unit. Entries never
/// expire; they are dropped only by `invalidate` or `clear` (reload).
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::cache_key::IdentityKey;
use super::engine::CompiledUnit;

type Slot = Arc<Mutex<Option<Arc<CompiledUnit>>>>;

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Concurrency-safe compiled-unit cache.
///
/// Each key owns a slot with its own lock. `get_or_compile` holds the slot
/// lock while compiling, so concurrent callers for the same key wait for the
/// first compile instead of duplicating it. Different keys never contend
/// beyond the brief map lookup.
#[derive(Default)]
pub struct CompiledUnitCache {
    slots: Mutex<HashMap<IdentityKey, Slot>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding the lock leaves the data intact (insert/remove only)
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CompiledUnitCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a compiled unit
    pub fn get(&self, key: &IdentityKey) -> Option<Arc<CompiledUnit>> {
        let slot = lock(&self.slots).get(key).cloned();
        let unit = match slot {
            Some(slot) => {
                let unit = lock(&slot).clone();
                unit
            }
            None => None,
        };

        match &unit {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };

        unit
    }

    /// Store a compiled unit, replacing any previous entry for the key
    pub fn put(&self, key: IdentityKey, unit: Arc<CompiledUnit>) {
        let slot = self.slot(key);
        *lock(&slot) = Some(unit);
    }

    /// Return the cached unit for `key`, compiling and storing it on a miss.
    ///
    /// A failed compile stores nothing and the error is returned to the caller.
    pub fn get_or_compile<E, F>(&self, key: &IdentityKey, compile: F) -> Result<Arc<CompiledUnit>, E>
    where
        F: FnOnce() -> Result<CompiledUnit, E>,
    {
        let slot = self.slot(key.clone());
        let mut guard = lock(&slot);

        if let Some(unit) = guard.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(operation = "cache.get", status = "hit", key = %key, "Load code from cache");
            return Ok(unit.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(operation = "cache.get", status = "miss", key = %key, "compiling");

        let unit = Arc::new(compile()?);
        *guard = Some(unit.clone());
        Ok(unit)
    }

    /// Drop the entry for one key. Returns whether a unit was cached.
    pub fn invalidate(&self, key: &IdentityKey) -> bool {
        let removed = lock(&self.slots).remove(key);
        let Some(slot) = removed else {
            return false;
        };
        let was_cached = lock(&slot).is_some();
        was_cached
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut slots = lock(&self.slots);
        let count = slots.len();
        slots.clear();
        tracing::debug!(operation = "cache.clear", entry_count = count, "cache cleared");
    }

    /// Number of stored units
    pub fn len(&self) -> usize {
        let slots: Vec<Slot> = lock(&self.slots).values().cloned().collect();
        slots.iter().filter(|slot| lock(slot).is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn slot(&self, key: IdentityKey) -> Slot {
        lock(&self.slots).entry(key).or_default().clone()
    }
}
