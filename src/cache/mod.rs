//! Response caching with LRU eviction and per-entry TTL.
//!
//! [`ResponseCache`] avoids redundant paid provider calls by memoizing
//! responses under deterministic keys (see [`key`]). The cache sits in
//! [`UnifiedProvider`](crate::gateway::UnifiedProvider), above the
//! fallback chain — a hit bypasses candidate selection, retry logic, and
//! the provider call entirely. Hit/miss metrics are emitted separately.
//!
//! # Eviction
//!
//! Capacity-bounded, strict LRU: a `get` on a live entry promotes it to
//! most-recently-used; inserting at capacity evicts exactly the
//! least-recently-used entry. Expired entries are purged lazily on access
//! and can be swept in bulk with [`ResponseCache::clear_expired`].
//!
//! # Concurrency
//!
//! All state (map + counters) lives behind one mutex; every public
//! operation is a single lock acquisition, so concurrent callers observe
//! each get/insert as atomic.

pub mod key;

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::telemetry;

/// Configuration for the response cache.
///
/// ```rust
/// # use bifrost::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(500)
///     .default_ttl(Duration::from_secs(300));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 1,000.
    pub max_entries: usize,
    /// TTL applied when an insert does not specify one. Default: 5 minutes.
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            default_ttl: Duration::from_secs(300),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the default time-to-live for cached entries.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
}

/// A cached value with its expiry bookkeeping.
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    created_at: Instant,
    expires_at: Instant,
    hits: u64,
}

impl<T> CacheEntry<T> {
    fn expired_at(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lifetime lookup hits.
    pub hits: u64,
    /// Lifetime lookup misses (including expired-on-access).
    pub misses: u64,
    /// Current entry count.
    pub size: usize,
    /// Configured capacity.
    pub max_size: usize,
}

impl CacheStats {
    /// Hit rate as a percentage of all lookups, 0.0 when none yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64 * 100.0
    }
}

struct CacheInner<T> {
    map: LruCache<String, CacheEntry<T>>,
    hits: u64,
    misses: u64,
}

/// In-memory LRU + TTL cache for provider responses.
///
/// Generic over the cached value; the orchestrator uses
/// `ResponseCache<AiResponse>`. Values are cloned out on hit.
pub struct ResponseCache<T: Clone> {
    inner: Mutex<CacheInner<T>>,
    default_ttl: Duration,
    max_entries: usize,
}

impl<T: Clone> ResponseCache<T> {
    /// Create a new cache from a configuration.
    ///
    /// A `max_entries` of zero is clamped to one — the LRU map cannot be
    /// zero-capacity; disable caching at the builder instead.
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries.max(1)).expect("clamped above zero");
        Self {
            inner: Mutex::new(CacheInner {
                map: LruCache::new(capacity),
                hits: 0,
                misses: 0,
            }),
            default_ttl: config.default_ttl,
            max_entries: capacity.get(),
        }
    }

    /// Look up a value, promoting it to most-recently-used on hit.
    ///
    /// An expired entry is removed as a side effect and counts as a miss.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        let expired = matches!(inner.map.peek(key), Some(entry) if entry.expired_at(now));
        if expired {
            inner.map.pop(key);
        }

        match inner.map.get_mut(key) {
            Some(entry) => {
                entry.hits += 1;
                let value = entry.value.clone();
                inner.hits += 1;
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                Some(value)
            }
            None => {
                inner.misses += 1;
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
        }
    }

    /// Insert a value with the default TTL, evicting the LRU entry if at
    /// capacity.
    pub fn insert(&self, key: impl Into<String>, value: T) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    /// Insert a value with an explicit TTL.
    pub fn insert_with_ttl(&self, key: impl Into<String>, value: T, ttl: Duration) {
        let now = Instant::now();
        let entry = CacheEntry {
            value,
            created_at: now,
            expires_at: now + ttl,
            hits: 0,
        };
        self.inner.lock().map.put(key.into(), entry);
    }

    /// Whether a live (non-expired) entry exists. Does not affect recency,
    /// but removes the entry if it has expired.
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        match inner.map.peek(key) {
            Some(entry) if entry.expired_at(now) => {
                inner.map.pop(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Remove an entry. Returns whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.inner.lock().map.pop(key).is_some()
    }

    /// Sweep all expired entries, returning how many were removed.
    pub fn clear_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let expired: Vec<String> = inner
            .map
            .iter()
            .filter(|(_, entry)| entry.expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            inner.map.pop(key);
        }
        expired.len()
    }

    /// Evict all entries. Lifetime hit/miss counters are preserved.
    pub fn clear(&self) {
        self.inner.lock().map.clear();
    }

    /// Current number of entries (expired-but-unswept entries included).
    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of hit/miss counters and occupancy.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            size: inner.map.len(),
            max_size: self.max_entries,
        }
    }

    /// Age of an entry, if present. Exposed for diagnostics.
    pub fn entry_age(&self, key: &str) -> Option<Duration> {
        let inner = self.inner.lock();
        inner
            .map
            .peek(key)
            .map(|entry| entry.created_at.elapsed())
    }
}
