//! Error types for the HVAC proxy.
//!
//! Every variant ends up as the generic 500 for the caller whose round-trip
//! failed; see `QueueError` for the HTTP mapping.

/// Proxy error types
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The thermostat could not be reached or answered with an error
    #[error("Backend error: {0}")]
    Backend(String),

    /// The thermostat answered with something that is not JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProxyError::Backend("connection refused".to_string());
        assert_eq!(err.to_string(), "Backend error: connection refused");
    }

    #[test]
    fn test_non_json_body_converts() {
        let err: ProxyError = serde_json::from_slice::<serde_json::Value>(b"not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, ProxyError::Serialization(_)));
        assert!(err.to_string().starts_with("Serialization error"));
    }
}
