//! Backend layer for forwarding requests to the thermostat device.
//!
//! The device exposes a small JSON API (`/read`, `/info`, `/set/{register}`)
//! behind a static bearer token. Only the request queue talks to it.

use async_trait::async_trait;
use axum::http::{header, Method, StatusCode};
use bytes::Bytes;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

use crate::error::ProxyError;

/// A request as it is sent to the device, proxy prefix already stripped
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    pub method: Method,
    /// Device path, e.g. `/set/3`
    pub path: String,
    /// Raw query string without the leading `?`
    pub query: Option<String>,
    pub body: Option<Bytes>,
}

/// The device's answer: status plus parsed JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Anything that can answer proxied requests on behalf of the device
#[async_trait]
pub trait Backend: Send + Sync {
    /// Perform one round-trip
    async fn send(&self, request: BackendRequest) -> Result<BackendResponse, ProxyError>;

    /// Check whether the device is reachable. This bypasses the queue and
    /// is only used before the server starts accepting requests.
    async fn health_check(&self) -> Result<(), ProxyError> {
        Ok(())
    }
}

/// HTTP client for the real device
#[derive(Clone)]
pub struct HttpBackend {
    /// HTTP client
    client: Client,
    /// Device base URL
    base_url: String,
    /// Value sent as `Authorization: Bearer <token>`
    auth_token: String,
}

impl HttpBackend {
    /// Create a new backend client
    pub fn new(
        base_url: impl Into<String>,
        auth_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProxyError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!(url = %base_url, "Creating thermostat backend");

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url,
            auth_token: auth_token.into(),
        })
    }

    /// Get the device base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the full device URL for a path and optional query
    pub fn url_for(&self, path: &str, query: Option<&str>) -> String {
        match query {
            Some(q) if !q.is_empty() => format!("{}{}?{}", self.base_url, path, q),
            _ => format!("{}{}", self.base_url, path),
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn send(&self, request: BackendRequest) -> Result<BackendResponse, ProxyError> {
        let url = self.url_for(&request.path, request.query.as_deref());
        debug!(url = %url, "Forwarding request to thermostat");

        let mut builder = self
            .client
            .request(request.method, &url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.auth_token))
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let body: Value = serde_json::from_slice(&bytes)?;

        debug!(status = %status, "Thermostat responded");
        Ok(BackendResponse { status, body })
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), ProxyError> {
        let url = self.url_for("/info", None);
        debug!(url = %url, "Checking thermostat health");

        let result = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.auth_token))
            .send()
            .await;

        let outcome = match result {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                error!(status = %status, body = %body, "Thermostat returned error");
                Err(ProxyError::Backend(format!(
                    "Thermostat returned status {}: {}",
                    status, body
                )))
            }
            Err(e) => {
                error!(error = %e, "Failed to connect to thermostat");
                Err(ProxyError::Backend(e.to_string()))
            }
        };

        crate::metrics::set_backend_healthy(outcome.is_ok());
        outcome
    }
}
