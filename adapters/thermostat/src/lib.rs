//! Thermostat client
//!
//! Talks to the thermostat through the HVAC proxy endpoint
//! (`{base_url}/api/proxy/*`) and turns raw register dumps into
//! [`ThermostatData`](hvac_core::ThermostatData).

use std::env;
use std::time::Duration;

mod client;
mod error;

pub use client::ThermostatClient;
pub use error::ClientError;

/// Default number of retries per device call
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the proxy (not the device)
    /// Default: "http://localhost:3000"
    pub base_url: String,

    /// Sent as the Authorization header when non-empty
    pub auth_token: String,

    /// Path under which the proxy forwards to the device
    /// Default: "/api/proxy"
    pub proxy_prefix: String,

    /// Retries after the first failed attempt
    /// Default: 3
    pub max_retries: u32,

    /// Per-request timeout
    /// Default: 10s
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            auth_token: String::new(),
            proxy_prefix: "/api/proxy".to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Read configuration from environment variables
    ///
    /// # Example
    /// ```
    /// use hvac_adapters_thermostat::ClientConfig;
    ///
    /// let config = ClientConfig::from_env();
    /// println!("Talking to {}", config.base_url);
    /// ```
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env::var("HVAC_PROXY_URL").unwrap_or(defaults.base_url),
            auth_token: env::var("HVAC_AUTH_TOKEN").unwrap_or(defaults.auth_token),
            proxy_prefix: defaults.proxy_prefix,
            max_retries: env::var("HVAC_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            timeout: defaults.timeout,
        }
    }

    /// Full URL for a device path, e.g. `/read`
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}{}{}",
            self.base_url.trim_end_matches('/'),
            self.proxy_prefix.trim_end_matches('/'),
            path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.max_retries, 3);
        assert!(config.auth_token.is_empty());
    }

    #[test]
    fn test_url_for() {
        let config = ClientConfig {
            base_url: "http://hvac.local:3000/".to_string(),
            ..ClientConfig::default()
        };
        assert_eq!(config.url_for("/read"), "http://hvac.local:3000/api/proxy/read");
        assert_eq!(config.url_for("/set/9"), "http://hvac.local:3000/api/proxy/set/9");
    }
}
