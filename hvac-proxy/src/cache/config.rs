//! Configuration for the response cache.

use std::time::Duration;

/// Configuration for the GET response cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a cached response is served before the backend is asked again
    pub ttl: Duration,

    /// Maximum number of distinct keys kept (least recently used are evicted)
    pub max_entries: usize,

    /// Interval of the background expiry sweep. `None` leaves stale entries
    /// in place until they are read or overwritten.
    pub sweep_interval: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_millis(1000),
            max_entries: 256,
            sweep_interval: None,
        }
    }
}

impl CacheConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("HVAC_CACHE_TTL_MS") {
            if let Ok(n) = val.parse() {
                config.ttl = Duration::from_millis(n);
            }
        }

        if let Ok(val) = std::env::var("HVAC_CACHE_SIZE") {
            if let Ok(n) = val.parse() {
                config.max_entries = n;
            }
        }

        if let Ok(val) = std::env::var("HVAC_CACHE_SWEEP_MS") {
            config.sweep_interval = val
                .parse()
                .ok()
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis);
        }

        config
    }
}
