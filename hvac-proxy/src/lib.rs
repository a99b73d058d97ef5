//! HVAC Proxy Library
//!
//! Serializes access to a single thermostat device.
//!
//! The device speaks a tiny JSON API and cannot cope with overlapping
//! connections. This library puts one FIFO request queue in front of it,
//! with a one second cache for GET responses, and exposes the queue as an
//! HTTP endpoint under `/api/proxy/*`. It can be used either as the
//! standalone `hvac-proxy` binary or through the `hvac serve` CLI command.

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

pub mod backend;
pub mod cache;
pub mod error;
pub mod metrics;
pub mod queue;
pub mod routes;
pub mod state;

pub use backend::{Backend, BackendRequest, BackendResponse, HttpBackend};
pub use cache::{CacheConfig, ResponseCache};
pub use error::ProxyError;
pub use queue::{ProxyRequest, ProxyResponse, QueueError, RequestQueue};
pub use state::{AppState, ProxyConfig};

/// Server configuration for the proxy
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listener and backend settings
    pub proxy: ProxyConfig,
    /// GET response cache settings
    pub cache: CacheConfig,
    /// Whether to print the banner on startup
    pub print_banner: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            proxy: ProxyConfig::default(),
            cache: CacheConfig::default(),
            print_banner: true,
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self {
            proxy: ProxyConfig::from_env(),
            cache: CacheConfig::from_env(),
            print_banner: true,
        }
    }
}

/// Initialize Prometheus metrics registry.
/// Should be called once before starting the server.
pub fn init_metrics() {
    if let Err(e) = metrics::register_metrics() {
        warn!("Failed to register Prometheus metrics: {}", e);
    }
}

/// Build the HTTP router around shared state
pub fn build_router(state: Arc<AppState>) -> Router {
    let proxy_route = format!("{}/*path", state.config.path_prefix.trim_end_matches('/'));
    let proxy_handler = get(routes::proxy)
        .post(routes::proxy)
        .put(routes::proxy)
        .delete(routes::proxy);

    Router::new()
        // Health endpoints
        .route("/health", get(routes::health))
        .route("/live", get(routes::live))
        .route("/metrics", get(routes::metrics))
        .route("/metrics/prometheus", get(routes::metrics_prometheus))
        // Queued pass-through to the thermostat
        .route(&proxy_route, proxy_handler)
        // Middleware
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the proxy server.
///
/// Starts the HTTP server and blocks until Ctrl-C. On shutdown the queue is
/// closed and requests still waiting are answered with 503.
///
/// # Example
/// ```no_run
/// use hvac_proxy::{run_server, ServerConfig};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let mut config = ServerConfig::default();
///     config.proxy.backend_url = "http://192.168.1.50".to_string();
///     run_server(config).await
/// }
/// ```
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    init_metrics();

    info!(
        port = config.proxy.port,
        backend_url = %config.proxy.backend_url,
        "Starting HVAC Proxy v{}",
        env!("CARGO_PKG_VERSION")
    );

    let state = Arc::new(AppState::new(config.proxy.clone(), config.cache.clone())?);

    match state.queue.backend().health_check().await {
        Ok(_) => info!("Connected to thermostat at {}", config.proxy.backend_url),
        Err(e) => {
            warn!(
                "Could not reach thermostat at {}: {}. \
                 Proxy will start anyway and retry on requests.",
                config.proxy.backend_url, e
            );
        }
    }

    let sweeper = state.queue.cache().spawn_sweeper();
    let app = build_router(state.clone());

    let addr = format!("0.0.0.0:{}", config.proxy.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("HVAC Proxy listening on http://{}", addr);
    if config.print_banner {
        print_banner(&config, &addr);
    }

    let queue = state.queue.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            queue.shutdown();
        })
        .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    info!("HVAC Proxy stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Print the startup banner
fn print_banner(config: &ServerConfig, addr: &str) {
    println!();
    println!("==================================================");
    println!("  HVAC Proxy v{}", env!("CARGO_PKG_VERSION"));
    println!("==================================================");
    println!("  Listening on: http://{}", addr);
    println!("  Thermostat:   {}", config.proxy.backend_url);
    println!(
        "  Auth token:   {}",
        if config.proxy.auth_token.is_empty() {
            "not set"
        } else {
            "set"
        }
    );
    println!();
    println!("  Cache configuration:");
    println!(
        "    TTL {} ms, max {} entries",
        config.cache.ttl.as_millis(),
        config.cache.max_entries
    );
    match config.cache.sweep_interval {
        Some(interval) => println!("    Sweep every {} ms", interval.as_millis()),
        None => println!("    Sweep: disabled (set HVAC_CACHE_SWEEP_MS to enable)"),
    }
    println!();
    println!("  Endpoints:");
    println!(
        "    Proxy:  GET|POST|PUT|DELETE {}/*",
        config.proxy.path_prefix
    );
    println!("    Health: GET  /health, /live, /metrics");
    println!("    Prometheus: GET /metrics/prometheus");
    println!("==================================================");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Echoes what it receives and remembers the calls
    #[derive(Default)]
    struct EchoBackend {
        calls: Mutex<Vec<BackendRequest>>,
        healthy: bool,
    }

    #[async_trait]
    impl Backend for EchoBackend {
        async fn send(&self, request: BackendRequest) -> Result<BackendResponse, ProxyError> {
            let unreachable =
                request.path == "/broken" || (request.path == "/info" && !self.healthy);
            if unreachable {
                return Err(ProxyError::Backend("device unreachable".to_string()));
            }
            self.calls.lock().unwrap().push(request.clone());
            Ok(BackendResponse {
                status: StatusCode::OK,
                body: json!({
                    "path": request.path,
                    "query": request.query,
                    "body": request.body.map(|b| String::from_utf8_lossy(&b).into_owned()),
                }),
            })
        }
    }

    fn app(backend: Arc<EchoBackend>) -> (Router, Arc<AppState>) {
        let state = Arc::new(AppState::with_backend(
            ProxyConfig::default(),
            CacheConfig::default(),
            backend,
        ));
        (build_router(state.clone()), state)
    }

    async fn call(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn request(method: Method, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_is_forwarded_without_prefix() {
        let backend = Arc::new(EchoBackend::default());
        let (router, _) = app(backend.clone());

        let (status, body) = call(router, request(Method::GET, "/api/proxy/read?x=1", "")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["path"], json!("/read"));
        assert_eq!(body["query"], json!("x=1"));
        assert_eq!(body["body"], Value::Null);
    }

    #[tokio::test]
    async fn test_put_body_is_forwarded() {
        let backend = Arc::new(EchoBackend::default());
        let (router, _) = app(backend.clone());

        let (status, body) = call(
            router,
            request(Method::PUT, "/api/proxy/set/3", r#"{"value":22}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["path"], json!("/set/3"));
        assert_eq!(body["body"], json!(r#"{"value":22}"#));

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::PUT);
    }

    #[tokio::test]
    async fn test_repeated_get_is_served_from_cache() {
        let backend = Arc::new(EchoBackend::default());
        let (router, state) = app(backend.clone());

        let first = call(router.clone(), request(Method::GET, "/api/proxy/read", "")).await;
        let second = call(router, request(Method::GET, "/api/proxy/read", "")).await;

        assert_eq!(first, second);
        assert_eq!(backend.calls.lock().unwrap().len(), 1);
        assert_eq!(state.queue.metrics().snapshot().requests_cached, 1);
    }

    #[tokio::test]
    async fn test_backend_failure_yields_generic_500() {
        let (router, _) = app(Arc::new(EchoBackend::default()));

        let (status, body) = call(router, request(Method::GET, "/api/proxy/broken", "")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Request processing failed" }));
    }

    #[tokio::test]
    async fn test_requests_after_shutdown_get_503() {
        let (router, state) = app(Arc::new(EchoBackend::default()));
        state.queue.shutdown();

        let (status, body) = call(router, request(Method::GET, "/api/proxy/read", "")).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!({ "error": "Proxy is shutting down" }));
    }

    #[tokio::test]
    async fn test_paths_outside_prefix_are_not_proxied() {
        let backend = Arc::new(EchoBackend::default());
        let (router, _) = app(backend.clone());

        let (status, _) = call(router, request(Method::GET, "/api/other/read", "")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_head_is_rejected_before_the_queue() {
        let backend = Arc::new(EchoBackend::default());
        let (router, state) = app(backend.clone());

        let response = router
            .oneshot(request(Method::HEAD, "/api/proxy/read", ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response.headers()["allow"].to_str().unwrap(),
            "GET, POST, PUT, DELETE"
        );
        assert!(backend.calls.lock().unwrap().is_empty());
        assert_eq!(state.queue.metrics().snapshot().requests_received, 0);
    }

    #[tokio::test]
    async fn test_health_reports_device_state() {
        let backend = Arc::new(EchoBackend {
            healthy: true,
            ..EchoBackend::default()
        });
        let (router, state) = app(backend.clone());
        let (status, body) = call(router, request(Method::GET, "/health", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["thermostat"], json!("connected"));
        // The probe is an ordinary queued request.
        assert_eq!(backend.calls.lock().unwrap()[0].path, "/info");
        assert_eq!(state.queue.metrics().snapshot().requests_received, 1);

        let (router, _) = app(Arc::new(EchoBackend::default()));
        let (status, body) = call(router, request(Method::GET, "/health", "")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["thermostat"], json!("disconnected"));
    }

    #[tokio::test]
    async fn test_metrics_endpoint_shape() {
        let (router, _) = app(Arc::new(EchoBackend::default()));

        let (status, body) = call(router, request(Method::GET, "/metrics", "")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["queue"]["queue_depth"], json!(0));
        assert_eq!(body["queue"]["stats"]["requests_received"], json!(0));
        assert_eq!(body["cache"]["config"]["ttl_ms"], json!(1000));
        assert_eq!(body["cache"]["entries"], json!(0));
        assert_eq!(body["cache"]["stats"]["hit_rate"], json!(0.0));
    }

    #[tokio::test]
    async fn test_live() {
        let (router, _) = app(Arc::new(EchoBackend::default()));
        let response = router
            .oneshot(request(Method::GET, "/live", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
