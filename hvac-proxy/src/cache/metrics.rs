//! Counters for the response cache.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

/// Lookup and maintenance counters
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// Fresh entries served
    pub hits: AtomicU64,
    /// Lookups with no entry at all
    pub misses: AtomicU64,
    /// Lookups that found an entry at or past the TTL
    pub stale: AtomicU64,
    pub puts: AtomicU64,
    /// Keys pushed out by the LRU bound
    pub evictions: AtomicU64,
    /// Expired entries removed by sweeps
    pub expirations: AtomicU64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Relaxed);
    }

    pub fn record_stale(&self) {
        self.stale.fetch_add(1, Relaxed);
    }

    pub fn record_put(&self) {
        self.puts.fetch_add(1, Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Relaxed);
    }

    pub fn record_expirations(&self, count: u64) {
        self.expirations.fetch_add(count, Relaxed);
    }

    fn counters(&self) -> [&AtomicU64; 6] {
        [
            &self.hits,
            &self.misses,
            &self.stale,
            &self.puts,
            &self.evictions,
            &self.expirations,
        ]
    }

    pub fn snapshot(&self) -> CacheStats {
        let [hits, misses, stale, puts, evictions, expirations] =
            self.counters().map(|c| c.load(Relaxed));
        let lookups = hits + misses + stale;

        CacheStats {
            hits,
            misses,
            stale,
            puts,
            evictions,
            expirations,
            hit_rate: match lookups {
                0 => 0.0,
                n => hits as f64 / n as f64,
            },
        }
    }

    /// Zero every counter
    pub fn reset(&self) {
        for counter in self.counters() {
            counter.store(0, Relaxed);
        }
    }
}

/// Point-in-time copy of [`CacheMetrics`]
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stale: u64,
    pub puts: u64,
    pub evictions: u64,
    pub expirations: u64,
    /// Fresh hits over all lookups
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_lookups_lower_the_hit_rate() {
        let metrics = CacheMetrics::new();

        for _ in 0..3 {
            metrics.record_hit();
        }
        metrics.record_miss();
        metrics.record_stale();

        let stats = metrics.snapshot();
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.stale, 1);
        assert!((stats.hit_rate - 0.6).abs() < 0.001);
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let metrics = CacheMetrics::new();
        metrics.record_hit();
        metrics.record_put();
        metrics.record_eviction();
        metrics.record_expirations(4);

        metrics.reset();

        let stats = metrics.snapshot();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.puts, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.expirations, 0);
        assert_eq!(stats.hit_rate, 0.0);
    }
}
