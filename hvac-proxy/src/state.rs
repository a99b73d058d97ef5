//! Application state for the HVAC proxy.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::backend::{Backend, HttpBackend};
use crate::cache::{CacheConfig, ResponseCache};
use crate::error::ProxyError;
use crate::queue::RequestQueue;

/// Path prefix under which the proxy endpoint is mounted
pub const DEFAULT_PATH_PREFIX: &str = "/api/proxy";

/// Application state shared across all handlers
pub struct AppState {
    /// The only route to the thermostat
    pub queue: RequestQueue,

    /// Configuration
    pub config: ProxyConfig,

    /// When the server started
    pub started_at: Instant,
}

impl AppState {
    /// Create state talking to the real device over HTTP
    pub fn new(config: ProxyConfig, cache_config: CacheConfig) -> Result<Self, ProxyError> {
        let backend = HttpBackend::new(
            config.backend_url.clone(),
            config.auth_token.clone(),
            config.backend_timeout,
        )?;
        Ok(Self::with_backend(config, cache_config, Arc::new(backend)))
    }

    /// Create state around any backend implementation
    pub fn with_backend(
        config: ProxyConfig,
        cache_config: CacheConfig,
        backend: Arc<dyn Backend>,
    ) -> Self {
        let queue = RequestQueue::new(
            backend,
            ResponseCache::new(cache_config),
            config.path_prefix.clone(),
        );
        Self {
            queue,
            config,
            started_at: Instant::now(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Proxy configuration
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Port to listen on
    pub port: u16,

    /// Thermostat base URL
    pub backend_url: String,

    /// Bearer token presented to the thermostat
    pub auth_token: String,

    /// Inbound prefix stripped before forwarding
    pub path_prefix: String,

    /// Transport timeout for one backend round-trip
    pub backend_timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            backend_url: "http://localhost:8080".to_string(),
            auth_token: String::new(),
            path_prefix: DEFAULT_PATH_PREFIX.to_string(),
            backend_timeout: Duration::from_secs(30),
        }
    }
}

impl ProxyConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: std::env::var("HVAC_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            backend_url: std::env::var("HVAC_BACKEND_URL")
                .or_else(|_| std::env::var("BACKEND_URL"))
                .unwrap_or(defaults.backend_url),
            auth_token: std::env::var("HVAC_AUTH_TOKEN")
                .or_else(|_| std::env::var("AUTH_TOKEN"))
                .unwrap_or(defaults.auth_token),
            path_prefix: defaults.path_prefix,
            backend_timeout: std::env::var("HVAC_BACKEND_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.backend_timeout),
        }
    }
}
