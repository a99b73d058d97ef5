//! Short-lived cache for GET responses from the thermostat.
//!
//! The thermostat UI polls `/read` roughly once a second from every open
//! tab. Answers are kept for one TTL (1 s by default) keyed by the exact
//! proxy path and query string, so concurrent pollers cost one backend call
//! per second instead of one each.
//!
//! ```text
//! GET /api/proxy/read?x=1
//!        │
//!        ▼
//! ┌──────────────┐   fresh    ┌──────────┐
//! │ ExactCache   │ ─────────► │  200 OK  │
//! │ (LRU + TTL)  │            └──────────┘
//! └──────┬───────┘
//!        │ missing / stale
//!        ▼
//!    Backend call, then put()
//! ```
//!
//! Whatever the backend answers is cached, error bodies included.

mod config;
mod exact;
mod metrics;

pub use config::CacheConfig;
pub use exact::{ExactCache, Lookup};
pub use metrics::{CacheMetrics, CacheStats};

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Shared handle to the GET response cache
#[derive(Clone)]
pub struct ResponseCache {
    exact: Arc<Mutex<ExactCache>>,
    metrics: Arc<CacheMetrics>,
    config: CacheConfig,
}

impl ResponseCache {
    /// Create a new response cache with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        Self {
            exact: Arc::new(Mutex::new(ExactCache::new(config.max_entries, config.ttl))),
            metrics: Arc::new(CacheMetrics::new()),
            config,
        }
    }

    /// Return the cached payload for `key` if it is still fresh
    pub async fn get(&self, key: &str) -> Option<Value> {
        let lookup = self.exact.lock().await.get(key);
        match lookup {
            Lookup::Fresh(payload) => {
                self.metrics.record_hit();
                crate::metrics::record_cache_hit();
                tracing::debug!(key = %key, "Cache hit");
                Some(payload)
            }
            Lookup::Stale => {
                self.metrics.record_stale();
                crate::metrics::record_cache_miss();
                None
            }
            Lookup::Missing => {
                self.metrics.record_miss();
                crate::metrics::record_cache_miss();
                None
            }
        }
    }

    /// Store a payload, overwriting any previous entry for `key`
    pub async fn put(&self, key: impl Into<String>, payload: Value) {
        let mut exact = self.exact.lock().await;
        if exact.put(key, payload) {
            self.metrics.record_eviction();
        }
        self.metrics.record_put();
        crate::metrics::set_cache_size(exact.len() as u64);
    }

    /// Drop every expired entry, returning how many were removed
    pub async fn evict_expired(&self) -> usize {
        let mut exact = self.exact.lock().await;
        let removed = exact.evict_expired();
        self.metrics.record_expirations(removed as u64);
        crate::metrics::set_cache_size(exact.len() as u64);
        removed
    }

    /// Start the periodic expiry sweep if one is configured
    pub fn spawn_sweeper(&self) -> Option<JoinHandle<()>> {
        let interval = self.config.sweep_interval?;
        let cache = self.clone();

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = cache.evict_expired().await;
                if removed > 0 {
                    tracing::debug!(removed, "Swept expired cache entries");
                }
            }
        }))
    }

    /// Number of entries currently held, fresh or not
    pub async fn len(&self) -> usize {
        self.exact.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.exact.lock().await.is_empty()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot()
    }

    /// Clear the cache and its counters
    pub async fn clear(&self) {
        self.exact.lock().await.clear();
        self.metrics.reset();
        crate::metrics::set_cache_size(0);
    }

    /// Get the cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}
