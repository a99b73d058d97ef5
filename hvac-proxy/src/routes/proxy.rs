//! The proxy endpoint.
//!
//! `GET|POST|PUT|DELETE {prefix}/*path` is handed to the request queue
//! verbatim: method, path, query string and body. Any other method (HEAD
//! included, which axum would otherwise route to the GET handler) is
//! answered with 405 and never reaches the device.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::queue::{ProxyRequest, ProxyResponse, QueueError};
use crate::state::AppState;

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE";

/// Forward a request to the thermostat through the queue
pub async fn proxy(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    if !ProxyRequest::is_forwarded_method(&method) {
        debug!(method = %method, uri = %uri, "Rejecting unsupported method");
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, ALLOWED_METHODS)],
            Json(json!({ "error": "Method not allowed" })),
        )
            .into_response();
    }

    debug!(method = %method, uri = %uri, "Handling proxy request");
    let result: Result<ProxyResponse, QueueError> = state
        .queue
        .enqueue(ProxyRequest::from_parts(method, &uri, body))
        .await;
    result.into_response()
}
