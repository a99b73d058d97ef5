//! Exact-key response cache with TTL freshness and LRU bound.

use lru::LruCache;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::time::Instant;

/// A cached payload with its insertion time
struct CachedEntry {
    payload: Value,
    created_at: Instant,
}

impl CachedEntry {
    fn new(payload: Value) -> Self {
        Self {
            payload,
            created_at: Instant::now(),
        }
    }

    /// Fresh only while `now - created_at < ttl`
    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() >= ttl
    }
}

/// Outcome of a lookup, so callers can tell misses from stale hits
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Fresh(Value),
    Stale,
    Missing,
}

/// Cache keyed by the exact request path and query string
pub struct ExactCache {
    cache: LruCache<String, CachedEntry>,
    ttl: Duration,
}

impl ExactCache {
    /// Create a new exact cache with the given capacity and TTL
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            ttl,
        }
    }

    /// Look up a key. Stale entries are dropped on read.
    pub fn get(&mut self, key: &str) -> Lookup {
        let expired = match self.cache.get(key) {
            Some(entry) if !entry.is_expired(self.ttl) => {
                return Lookup::Fresh(entry.payload.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.cache.pop(key);
            Lookup::Stale
        } else {
            Lookup::Missing
        }
    }

    /// Store a payload, replacing whatever was cached for the key.
    ///
    /// Returns `true` when another key had to be evicted to make room.
    pub fn put(&mut self, key: impl Into<String>, payload: Value) -> bool {
        let key = key.into();
        let evicts = !self.cache.contains(&key) && self.cache.len() == self.cache.cap().get();
        self.cache.put(key, CachedEntry::new(payload));
        evicts
    }

    /// Get the current number of entries
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Remove expired entries
    pub fn evict_expired(&mut self) -> usize {
        let ttl = self.ttl;
        let expired_keys: Vec<String> = self
            .cache
            .iter()
            .filter(|(_, entry)| entry.is_expired(ttl))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.cache.pop(key);
        }

        expired_keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit() {
        let mut cache = ExactCache::new(16, Duration::from_millis(1000));
        cache.put("/api/proxy/read", json!([215, 0, 22]));

        assert_eq!(
            cache.get("/api/proxy/read"),
            Lookup::Fresh(json!([215, 0, 22]))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_miss() {
        let mut cache = ExactCache::new(16, Duration::from_millis(1000));
        assert_eq!(cache.get("/api/proxy/read"), Lookup::Missing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_string_is_part_of_key() {
        let mut cache = ExactCache::new(16, Duration::from_millis(1000));
        cache.put("/api/proxy/read?reg=1", json!(1));

        assert_eq!(cache.get("/api/proxy/read"), Lookup::Missing);
        assert_eq!(cache.get("/api/proxy/read?reg=1"), Lookup::Fresh(json!(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_at_ttl() {
        let mut cache = ExactCache::new(16, Duration::from_millis(1000));
        cache.put("/api/proxy/read", json!("a"));

        tokio::time::advance(Duration::from_millis(999)).await;
        assert_eq!(cache.get("/api/proxy/read"), Lookup::Fresh(json!("a")));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get("/api/proxy/read"), Lookup::Stale);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_overwrites_and_refreshes() {
        let mut cache = ExactCache::new(16, Duration::from_millis(1000));
        cache.put("/k", json!(1));
        tokio::time::advance(Duration::from_millis(800)).await;
        cache.put("/k", json!(2));
        tokio::time::advance(Duration::from_millis(800)).await;

        assert_eq!(cache.get("/k"), Lookup::Fresh(json!(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lru_eviction() {
        let mut cache = ExactCache::new(2, Duration::from_secs(60));

        assert!(!cache.put("/one", json!(1)));
        assert!(!cache.put("/two", json!(2)));
        assert!(!cache.put("/two", json!(22)));
        assert!(cache.put("/three", json!(3)));

        assert_eq!(cache.get("/one"), Lookup::Missing);
        assert_eq!(cache.get("/two"), Lookup::Fresh(json!(22)));
        assert_eq!(cache.get("/three"), Lookup::Fresh(json!(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_expired() {
        let mut cache = ExactCache::new(16, Duration::from_millis(1000));
        cache.put("/old", json!(1));
        tokio::time::advance(Duration::from_millis(600)).await;
        cache.put("/new", json!(2));
        tokio::time::advance(Duration::from_millis(500)).await;

        assert_eq!(cache.evict_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("/new"), Lookup::Fresh(json!(2)));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut cache = ExactCache::new(0, Duration::from_secs(1));
        cache.clear();
        assert!(cache.is_empty());
    }
}
