//! Single-lane FIFO queue in front of the thermostat backend.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use super::metrics::{QueueMetrics, RequestTimer};
use super::request::{ProxyRequest, ProxyResponse};
use crate::backend::Backend;
use crate::cache::ResponseCache;
use crate::error::ProxyError;
use crate::metrics::BackendTimer;

/// Error types for queue operations
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The backend round-trip for this request failed
    #[error("Request processing failed: {0}")]
    Backend(#[from] ProxyError),

    #[error("Queue shutdown")]
    Shutdown,

    /// The completion handle went away without an answer
    #[error("Request was dropped before completion")]
    Dropped,
}

impl IntoResponse for QueueError {
    fn into_response(self) -> Response {
        match self {
            QueueError::Backend(_) | QueueError::Dropped => {
                ProxyResponse::processing_failed().into_response()
            }
            QueueError::Shutdown => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "Proxy is shutting down" })),
            )
                .into_response(),
        }
    }
}

type Reply = oneshot::Sender<Result<ProxyResponse, QueueError>>;

/// A request waiting in the queue with its completion handle
pub struct QueuedRequest {
    pub request: ProxyRequest,
    reply: Reply,
    pub timer: RequestTimer,
}

impl QueuedRequest {
    fn new(request: ProxyRequest, reply: Reply) -> Self {
        Self {
            request,
            reply,
            timer: RequestTimer::new(),
        }
    }

    /// Fulfil the completion handle. Consumes the entry so it happens once.
    fn complete(self, result: Result<ProxyResponse, QueueError>) {
        if self.reply.send(result).is_err() {
            debug!("Caller went away before its response was ready");
        }
    }
}

/// Handle to a submitted request's eventual response
pub struct PendingResponse {
    rx: oneshot::Receiver<Result<ProxyResponse, QueueError>>,
}

impl PendingResponse {
    /// Wait until the queue has processed the request
    pub async fn wait(self) -> Result<ProxyResponse, QueueError> {
        self.rx.await.map_err(|_| QueueError::Dropped)?
    }
}

/// Pending list and processing flag, always locked together
#[derive(Default)]
struct QueueState {
    pending: VecDeque<QueuedRequest>,
    /// True iff a processing pass is running
    processing: bool,
    closed: bool,
}

struct Inner {
    state: Mutex<QueueState>,
    backend: Arc<dyn Backend>,
    cache: ResponseCache,
    metrics: Arc<QueueMetrics>,
    path_prefix: String,
}

/// Serializes every proxied request into one backend call at a time.
///
/// Requests are served strictly in arrival order. GET answers are cached
/// for the configured TTL and replayed without touching the backend.
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct RequestQueue {
    inner: Arc<Inner>,
}

impl RequestQueue {
    /// Create a queue in front of `backend`; `path_prefix` is stripped from
    /// inbound paths before they are forwarded
    pub fn new(
        backend: Arc<dyn Backend>,
        cache: ResponseCache,
        path_prefix: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState::default()),
                backend,
                cache,
                metrics: Arc::new(QueueMetrics::new()),
                path_prefix: path_prefix.into(),
            }),
        }
    }

    /// Enqueue a request and wait for its response
    pub async fn enqueue(&self, request: ProxyRequest) -> Result<ProxyResponse, QueueError> {
        self.submit(request)?.wait().await
    }

    /// Append a request to the tail and start a processing pass if none is
    /// running. Must be called from within a Tokio runtime.
    pub fn submit(&self, request: ProxyRequest) -> Result<PendingResponse, QueueError> {
        let (tx, rx) = oneshot::channel();

        let start_pass = {
            let mut state = self.inner.lock_state();
            if state.closed {
                self.inner.metrics.record_rejected();
                crate::metrics::record_rejected();
                return Err(QueueError::Shutdown);
            }

            debug!(
                method = %request.method,
                path = %request.path,
                queue_depth = state.pending.len(),
                "Request enqueued"
            );
            state.pending.push_back(QueuedRequest::new(request, tx));
            self.inner.metrics.record_queued();
            crate::metrics::set_queue_size(state.pending.len() as u64);

            !std::mem::replace(&mut state.processing, true)
        };

        if start_pass {
            tokio::spawn(Arc::clone(&self.inner).run_pass());
        }

        Ok(PendingResponse { rx })
    }

    /// Check the device with a queued `GET {prefix}/info`. The probe waits
    /// its turn like any proxied request, and a fresh cached answer counts.
    pub async fn probe(&self) -> Result<(), QueueError> {
        let path = format!("{}/info", self.inner.path_prefix.trim_end_matches('/'));
        let response = self.enqueue(ProxyRequest::new(Method::GET, path)).await?;

        if response.status.is_success() {
            Ok(())
        } else {
            Err(ProxyError::Backend(format!(
                "Thermostat returned status {}",
                response.status
            ))
            .into())
        }
    }

    /// Close the queue. Requests still waiting are answered with
    /// [`QueueError::Shutdown`]; the one in flight finishes normally.
    ///
    /// Returns how many waiting requests were dropped.
    pub fn shutdown(&self) -> usize {
        let drained: Vec<QueuedRequest> = {
            let mut state = self.inner.lock_state();
            state.closed = true;
            state.pending.drain(..).collect()
        };

        let count = drained.len();
        self.inner.metrics.record_drained(count as u64);
        crate::metrics::set_queue_size(0);
        for queued in drained {
            queued.complete(Err(QueueError::Shutdown));
        }

        info!(dropped = count, "Request queue shut down");
        count
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock_state().closed
    }

    /// Number of requests waiting (excluding the one in flight)
    pub fn queue_depth(&self) -> usize {
        self.inner.lock_state().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue_depth() == 0
    }

    /// Whether a processing pass is currently running
    pub fn is_processing(&self) -> bool {
        self.inner.lock_state().processing
    }

    pub fn metrics(&self) -> &Arc<QueueMetrics> {
        &self.inner.metrics
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.inner.cache
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.inner.backend
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drain the pending list one request at a time. Only one pass exists at
    /// any moment; the flag is cleared under the same lock that observes the
    /// list empty, so a concurrent `submit` either sees the flag set and
    /// leaves its entry for this pass, or sees it clear and starts a new one.
    async fn run_pass(self: Arc<Self>) {
        loop {
            let next = {
                let mut state = self.lock_state();
                match state.pending.pop_front() {
                    Some(next) => {
                        crate::metrics::set_queue_size(state.pending.len() as u64);
                        next
                    }
                    None => {
                        state.processing = false;
                        return;
                    }
                }
            };

            // A panic while handling one request must not wedge the queue.
            let worker = Arc::clone(&self);
            if let Err(e) = tokio::spawn(async move { worker.process(next).await }).await {
                error!(error = %e, "Request task aborted");
                self.metrics.record_failed(std::time::Duration::ZERO);
            }
        }
    }

    async fn process(&self, mut queued: QueuedRequest) {
        queued.timer.start_processing();
        let wait = queued.timer.queue_wait_time();
        self.metrics.record_dequeued(wait);
        crate::metrics::record_queue_wait(wait.as_secs_f64());

        debug!(
            method = %queued.request.method,
            path = %queued.request.path,
            wait_ms = wait.as_millis() as u64,
            "Request dequeued"
        );

        let result = self.execute(queued.request.clone()).await;
        let elapsed = queued.timer.processing_time();

        match &result {
            Ok(_) => self.metrics.record_completed(elapsed),
            Err(e) => {
                error!(
                    method = %queued.request.method,
                    path = %queued.request.path,
                    error = %e,
                    "Error processing request"
                );
                self.metrics.record_failed(elapsed);
            }
        }

        queued.complete(result);
    }

    async fn execute(&self, request: ProxyRequest) -> Result<ProxyResponse, QueueError> {
        let cache_key = request.is_cacheable().then(|| request.cache_key());

        if let Some(key) = &cache_key {
            if let Some(payload) = self.cache.get(key).await {
                self.metrics.record_cached();
                crate::metrics::record_cached_response(request.method.as_str());
                return Ok(ProxyResponse::cached(payload));
            }
        }

        let timer = BackendTimer::new(request.method.as_str());
        let response = match self
            .backend
            .send(request.into_backend_request(&self.path_prefix))
            .await
        {
            Ok(response) => {
                timer.record_success();
                response
            }
            Err(e) => {
                timer.record_failure();
                return Err(e.into());
            }
        };

        // Cached whatever the status: an error body is replayed as a 200
        // for the rest of the TTL.
        if let Some(key) = cache_key {
            self.cache.put(key, response.body.clone()).await;
        }

        Ok(ProxyResponse::new(response.status, response.body))
    }
}
