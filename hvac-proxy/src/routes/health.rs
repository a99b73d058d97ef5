//! Health check and metrics endpoints.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::state::AppState;

/// Health check endpoint
///
/// GET /health
///
/// The probe is queued behind any pending device traffic, so this can take
/// as long as the queue ahead of it.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let probe = state.queue.probe().await;
    crate::metrics::set_backend_healthy(probe.is_ok());

    match probe {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "thermostat": "connected",
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "thermostat": "disconnected",
                "error": e.to_string(),
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
    }
}

/// Metrics endpoint with queue and cache statistics
///
/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cache = state.queue.cache();
    let config = cache.config();

    Json(json!({
        "uptime_secs": state.uptime().as_secs(),
        "queue": {
            "queue_depth": state.queue.queue_depth(),
            "processing": state.queue.is_processing(),
            "closed": state.queue.is_closed(),
            "stats": state.queue.metrics().snapshot()
        },
        "cache": {
            "config": {
                "ttl_ms": config.ttl.as_millis() as u64,
                "max_entries": config.max_entries,
                "sweep_interval_ms": config.sweep_interval.map(|d| d.as_millis() as u64)
            },
            "entries": cache.len().await,
            "stats": cache.stats()
        }
    }))
}

/// Prometheus metrics endpoint
///
/// GET /metrics/prometheus
pub async fn metrics_prometheus() -> impl IntoResponse {
    (
        [("Content-Type", "text/plain; version=0.0.4")],
        crate::metrics::encode_metrics(),
    )
}

/// Live check (for Kubernetes)
///
/// GET /live
pub async fn live() -> impl IntoResponse {
    StatusCode::OK
}
