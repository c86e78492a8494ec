//! Bounded result cache with least-recently-used eviction.
//!
//! Keys are request fingerprints; values are full response envelopes. An
//! envelope carrying GraphQL `errors` is cached exactly like a success;
//! only transport-level failures bypass the cache entirely. Eviction and
//! insertion happen under one write lock, so lookups never observe a
//! half-evicted state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use wireql_protocol::{Fingerprint, Response};

/// Cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_entries: 128 }
    }
}

/// Cache entry with recency metadata.
#[derive(Debug, Clone)]
struct CacheEntry {
    response: Response,
    last_used: u64,
}

/// Cache statistics snapshot.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Lookups that returned a cached envelope.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Entries evicted to make room.
    pub evictions: u64,
    /// Current entry count.
    pub current_entries: usize,
}

/// Thread-safe bounded response cache.
#[derive(Debug)]
pub struct ResultCache {
    config: CacheConfig,
    entries: RwLock<HashMap<Fingerprint, CacheEntry>>,
    // Monotonic recency tick; larger = more recently used.
    tick: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ResultCache {
    /// Create a cache with the given configuration.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
            tick: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up a cached envelope, refreshing its recency on a hit.
    pub fn get(&self, key: &Fingerprint) -> Option<Response> {
        let mut entries = self.entries.write();
        match entries.get_mut(key) {
            Some(entry) => {
                entry.last_used = self.tick.fetch_add(1, Ordering::Relaxed) + 1;
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.response.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store an envelope, evicting the least-recently-used entry when at
    /// capacity.
    pub fn put(&self, key: Fingerprint, response: Response) {
        if self.config.max_entries == 0 {
            return;
        }
        let mut entries = self.entries.write();
        if !entries.contains_key(&key) && entries.len() >= self.config.max_entries {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(k, _)| *k)
            {
                entries.remove(&oldest);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(key = %oldest, "evicted least-recently-used cache entry");
            }
        }
        let last_used = self.tick.fetch_add(1, Ordering::Relaxed) + 1;
        entries.insert(key, CacheEntry { response, last_used });
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop all cached entries.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Get cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            current_entries: self.entries.read().len(),
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wireql_protocol::Request;

    fn key(document: &str) -> Fingerprint {
        Request::new(document).fingerprint()
    }

    fn envelope(n: i64) -> Response {
        Response::of_data(json!({"n": n}))
    }

    #[test]
    fn put_then_get_round_trips() {
        let cache = ResultCache::default();
        cache.put(key("{ a }"), envelope(1));
        assert_eq!(cache.get(&key("{ a }")), Some(envelope(1)));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.current_entries, 1);
    }

    #[test]
    fn miss_is_counted() {
        let cache = ResultCache::default();
        assert_eq!(cache.get(&key("{ a }")), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn filling_past_capacity_evicts_exactly_the_lru_entry() {
        let cache = ResultCache::new(CacheConfig { max_entries: 3 });
        cache.put(key("{ a }"), envelope(1));
        cache.put(key("{ b }"), envelope(2));
        cache.put(key("{ c }"), envelope(3));

        // Touch `a` so `b` becomes least recently used.
        assert!(cache.get(&key("{ a }")).is_some());

        cache.put(key("{ d }"), envelope(4));

        assert_eq!(cache.len(), 3);
        assert!(cache.get(&key("{ b }")).is_none(), "lru entry should be gone");
        assert!(cache.get(&key("{ a }")).is_some());
        assert!(cache.get(&key("{ c }")).is_some());
        assert!(cache.get(&key("{ d }")).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn overwriting_an_existing_key_does_not_evict() {
        let cache = ResultCache::new(CacheConfig { max_entries: 2 });
        cache.put(key("{ a }"), envelope(1));
        cache.put(key("{ b }"), envelope(2));
        cache.put(key("{ a }"), envelope(10));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.get(&key("{ a }")), Some(envelope(10)));
    }

    #[test]
    fn error_envelopes_are_cached_as_is() {
        let cache = ResultCache::default();
        let failed: Response =
            serde_json::from_value(json!({"errors": [{"message": "boom"}]})).unwrap();
        cache.put(key("{ a }"), failed.clone());
        assert_eq!(cache.get(&key("{ a }")), Some(failed));
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let cache = ResultCache::new(CacheConfig { max_entries: 0 });
        cache.put(key("{ a }"), envelope(1));
        assert!(cache.is_empty());
    }
}
