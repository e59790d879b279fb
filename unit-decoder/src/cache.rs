//! Query result cache with fixed expiry.
//!
//! Keyed by normalized query plus filter, so "Tola" and " tolā" share an
//! entry. Expired entries are never served. A zero TTL or zero capacity turns
//! the cache into a no-op.
//!
//! Every `clear` advances a generation counter. Callers read the generation
//! before computing a result and hand it back to `insert`; a result computed
//! against an older catalog is dropped instead of cached.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::interface::{SearchFilter, Unit};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub normalized_query: String,
    pub filter: SearchFilter,
}

struct CacheEntry {
    inserted_at: Instant,
    units: Vec<Unit>,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() >= ttl
    }
}

pub struct QueryCache {
    ttl: Duration,
    /// `None` when disabled
    entries: Option<Mutex<LruCache<CacheKey, CacheEntry>>>,
    generation: AtomicU64,
}

impl QueryCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        let entries = match NonZeroUsize::new(capacity) {
            Some(capacity) if !ttl.is_zero() => Some(Mutex::new(LruCache::new(capacity))),
            _ => None,
        };
        Self {
            ttl,
            entries,
            generation: AtomicU64::new(0),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, 0)
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    /// Current generation; pass it to `insert` with the result computed after
    /// reading it.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn get(&self, key: &CacheKey) -> Option<Vec<Unit>> {
        let mut entries = self.entries.as_ref()?.lock();
        match entries.get(key) {
            Some(entry) if !entry.is_expired(self.ttl) => return Some(entry.units.clone()),
            Some(_) => {}
            None => return None,
        }
        entries.pop(key);
        None
    }

    /// Store `units` unless the cache was cleared since `generation` was read.
    /// A full cache evicts its least recently used entry.
    pub fn insert(&self, key: CacheKey, units: Vec<Unit>, generation: u64) {
        let Some(entries) = self.entries.as_ref() else {
            return;
        };
        let mut entries = entries.lock();
        // Checked under the lock: `clear` bumps the counter while holding it.
        if self.generation.load(Ordering::Acquire) != generation {
            tracing::debug!(query = %key.normalized_query, "catalog changed during search, result not cached");
            return;
        }
        entries.put(
            key,
            CacheEntry {
                inserted_at: Instant::now(),
                units,
            },
        );
    }

    /// Drop everything. Called after any write to the catalog.
    pub fn clear(&self) {
        match self.entries.as_ref() {
            Some(entries) => {
                let mut entries = entries.lock();
                self.generation.fetch_add(1, Ordering::AcqRel);
                entries.clear();
            }
            None => {
                self.generation.fetch_add(1, Ordering::AcqRel);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| entries.lock().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
