//! Request and response descriptors carried through the queue.

use axum::{
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde_json::{json, Value};

use crate::backend::BackendRequest;

/// Body returned to callers whose request could not be processed
pub const PROCESSING_FAILED_MESSAGE: &str = "Request processing failed";

/// An inbound proxy request waiting for its turn
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyRequest {
    pub method: Method,
    /// Full inbound path, proxy prefix included
    pub path: String,
    /// Raw query string without the leading `?`
    pub query: Option<String>,
    /// Request body; always `None` for GET
    pub body: Option<Bytes>,
}

impl ProxyRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            body: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query = (!query.is_empty()).then_some(query);
        self
    }

    /// Attach a body. Ignored for GET requests.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        if self.method != Method::GET {
            self.body = Some(body.into());
        }
        self
    }

    /// Build from the pieces an axum handler extracts
    pub fn from_parts(method: Method, uri: &Uri, body: Bytes) -> Self {
        let mut request = Self::new(method, uri.path());
        if let Some(query) = uri.query() {
            request = request.with_query(query);
        }
        request.with_body(body)
    }

    /// Methods the proxy passes on to the device
    pub fn is_forwarded_method(method: &Method) -> bool {
        matches!(
            *method,
            Method::GET | Method::POST | Method::PUT | Method::DELETE
        )
    }

    /// Only GET responses are cached
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET
    }

    /// Cache key: the inbound path followed by `?query` when present
    pub fn cache_key(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }

    /// Device path with the proxy prefix removed
    pub fn backend_path(&self, prefix: &str) -> String {
        let stripped = self.path.strip_prefix(prefix).unwrap_or(&self.path);
        if stripped.is_empty() {
            "/".to_string()
        } else {
            stripped.to_string()
        }
    }

    pub(crate) fn into_backend_request(self, prefix: &str) -> BackendRequest {
        BackendRequest {
            path: self.backend_path(prefix),
            method: self.method,
            query: self.query,
            body: self.body,
        }
    }
}

/// What a caller gets back: status and JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ProxyResponse {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    /// A cached payload is always replayed as 200
    pub fn cached(body: Value) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// The generic 500 answer for a failed round-trip
    pub fn processing_failed() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": PROCESSING_FAILED_MESSAGE }),
        )
    }
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_includes_query() {
        let request = ProxyRequest::new(Method::GET, "/api/proxy/read").with_query("a=1&b=2");
        assert_eq!(request.cache_key(), "/api/proxy/read?a=1&b=2");

        let request = ProxyRequest::new(Method::GET, "/api/proxy/read").with_query("");
        assert_eq!(request.cache_key(), "/api/proxy/read");
    }

    #[test]
    fn test_backend_path_strips_prefix() {
        let request = ProxyRequest::new(Method::PUT, "/api/proxy/set/3");
        assert_eq!(request.backend_path("/api/proxy"), "/set/3");

        let request = ProxyRequest::new(Method::GET, "/api/proxy");
        assert_eq!(request.backend_path("/api/proxy"), "/");

        let request = ProxyRequest::new(Method::GET, "/read");
        assert_eq!(request.backend_path("/api/proxy"), "/read");
    }

    #[test]
    fn test_get_body_is_dropped() {
        let request = ProxyRequest::new(Method::GET, "/api/proxy/read").with_body("{}");
        assert!(request.body.is_none());

        let request = ProxyRequest::new(Method::PUT, "/api/proxy/set/3").with_body("{\"value\":22}");
        assert_eq!(request.body, Some(Bytes::from_static(b"{\"value\":22}")));
    }

    #[test]
    fn test_from_parts() {
        let uri: Uri = "/api/proxy/read?x=1".parse().unwrap();
        let request = ProxyRequest::from_parts(Method::GET, &uri, Bytes::new());

        assert_eq!(request.path, "/api/proxy/read");
        assert_eq!(request.query.as_deref(), Some("x=1"));
        assert!(request.is_cacheable());

        let backend = request.into_backend_request("/api/proxy");
        assert_eq!(backend.path, "/read");
        assert_eq!(backend.query.as_deref(), Some("x=1"));
    }

    #[test]
    fn test_forwarded_methods() {
        for method in [Method::GET, Method::POST, Method::PUT, Method::DELETE] {
            assert!(ProxyRequest::is_forwarded_method(&method), "{}", method);
        }
        for method in [Method::HEAD, Method::OPTIONS, Method::PATCH] {
            assert!(!ProxyRequest::is_forwarded_method(&method), "{}", method);
        }
    }

    #[test]
    fn test_processing_failed_body() {
        let response = ProxyResponse::processing_failed();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body, json!({"error": "Request processing failed"}));
    }
}
