//! Resolution cache.
//!
//! Process-wide map from (uuid, entity type) to the last resolution result.
//! Entries older than the configured timeout read as absent; failures are
//! stored like successes so a broken authority is not hammered within the
//! expiry window. The map is bounded: past `capacity` the least recently
//! used entry is evicted, and expired entries are swept from `put` at most
//! once per timeout period.

use std::num::NonZeroUsize;
use std::time::Duration;

use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::entity::{EntityType, ResolvedEntity};

/// Default entry lifetime.
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(300);

/// Default maximum number of entries.
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Cache key: canonical uuid plus the guessed entity type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub uuid: String,
    pub entity_type: EntityType,
}

impl CacheKey {
    pub fn new(uuid: &str, entity_type: EntityType) -> Self {
        Self {
            uuid: uuid.to_ascii_lowercase(),
            entity_type,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: ResolvedEntity,
    inserted_at: Instant,
}

#[derive(Debug)]
struct CacheState {
    entries: LruCache<CacheKey, CacheEntry>,
    last_sweep: Instant,
}

impl CacheState {
    fn remove_expired(&mut self, timeout: Duration) -> usize {
        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, e)| e.inserted_at.elapsed() > timeout)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            self.entries.pop(key);
        }
        self.last_sweep = Instant::now();
        expired.len()
    }
}

/// Bounded TTL cache of resolved entities.
#[derive(Debug)]
pub struct ResolutionCache {
    state: Mutex<CacheState>,
    timeout: RwLock<Duration>,
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TIMEOUT)
    }
}

impl ResolutionCache {
    pub fn new(timeout: Duration) -> Self {
        Self::with_capacity(timeout, DEFAULT_CACHE_CAPACITY)
    }

    /// Cache holding at most `capacity` entries (a zero capacity holds one).
    pub fn with_capacity(timeout: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                last_sweep: Instant::now(),
            }),
            timeout: RwLock::new(timeout),
        }
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().entries.cap().get()
    }

    pub fn timeout(&self) -> Duration {
        *self.timeout.read()
    }

    /// Change the expiry; applies to existing entries too.
    pub fn set_timeout(&self, timeout: Duration) {
        *self.timeout.write() = timeout;
    }

    /// Cached value, unless missing or older than the timeout.
    pub fn get(&self, uuid: &str, entity_type: EntityType) -> Option<ResolvedEntity> {
        let key = CacheKey::new(uuid, entity_type);
        let timeout = self.timeout();
        let mut state = self.state.lock();
        let fresh = state
            .entries
            .get(&key)
            .map(|entry| (entry.inserted_at.elapsed() <= timeout).then(|| entry.value.clone()))?;
        if fresh.is_none() {
            state.entries.pop(&key);
        }
        fresh
    }

    /// Insert or replace the entry for (uuid, type), evicting the least
    /// recently used entry when full.
    pub fn put(&self, uuid: &str, entity_type: EntityType, value: ResolvedEntity) {
        let timeout = self.timeout();
        let mut state = self.state.lock();
        if state.last_sweep.elapsed() >= timeout {
            let removed = state.remove_expired(timeout);
            if removed > 0 {
                trace!(removed, "Swept expired cache entries");
            }
        }
        let key = CacheKey::new(uuid, entity_type);
        let entry = CacheEntry {
            value,
            inserted_at: Instant::now(),
        };
        if let Some((evicted, _)) = state.entries.push(key.clone(), entry) {
            if evicted != key {
                trace!(uuid = %evicted.uuid, "Evicted least recently used cache entry");
            }
        }
    }

    /// Drop every entry regardless of age.
    pub fn invalidate_all(&self) {
        let mut state = self.state.lock();
        let count = state.entries.len();
        state.entries.clear();
        debug!(count, "Resolution cache cleared");
    }

    /// Drop expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let timeout = self.timeout();
        self.state.lock().remove_expired(timeout)
    }

    /// Stored entries, including expired ones not yet read or swept.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }
}
