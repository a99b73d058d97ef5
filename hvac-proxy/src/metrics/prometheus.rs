//! Prometheus collectors for the HVAC proxy, served on `/metrics/prometheus`.
//!
//! All names live under the `hvac_` namespace. Collectors exist from first
//! use; they only show up in the output once [`register_metrics`] has run.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};

lazy_static! {
    /// Registry backing the text endpoint
    pub static ref REGISTRY: Registry = Registry::new();

    /// Proxied requests by method and outcome
    pub static ref REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("requests_total", "Total number of proxied requests")
            .namespace("hvac"),
        &["method", "outcome"]
    ).expect("metric can be created");

    /// Backend round-trip duration histogram
    pub static ref BACKEND_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "backend_duration_seconds",
            "Backend round-trip duration in seconds"
        )
        .namespace("hvac")
        .buckets(vec![0.005, 0.02, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 30.0]),
        &["method"]
    ).expect("metric can be created");

    pub static ref CACHE_HITS_TOTAL: Counter = Counter::with_opts(
        Opts::new("cache_hits_total", "Total GET cache hits")
            .namespace("hvac")
    ).expect("metric can be created");

    pub static ref CACHE_MISSES_TOTAL: Counter = Counter::with_opts(
        Opts::new("cache_misses_total", "Total GET cache misses (missing or stale)")
            .namespace("hvac")
    ).expect("metric can be created");

    pub static ref CACHE_SIZE: Gauge = Gauge::with_opts(
        Opts::new("cache_size", "Entries held by the GET cache, fresh or stale")
            .namespace("hvac")
    ).expect("metric can be created");

    /// Requests waiting behind the one in flight
    pub static ref QUEUE_SIZE: Gauge = Gauge::with_opts(
        Opts::new("queue_size", "Current number of requests waiting in queue")
            .namespace("hvac")
    ).expect("metric can be created");

    pub static ref QUEUE_WAIT_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "queue_wait_seconds",
            "Time between arrival and pickup by the queue"
        )
        .namespace("hvac")
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0])
    ).expect("metric can be created");

    /// Requests refused because the queue was shutting down
    pub static ref REQUESTS_REJECTED_TOTAL: Counter = Counter::with_opts(
        Opts::new("requests_rejected_total", "Total requests rejected during shutdown")
            .namespace("hvac")
    ).expect("metric can be created");

    /// Result of the last device probe
    pub static ref BACKEND_HEALTHY: Gauge = Gauge::with_opts(
        Opts::new("backend_healthy", "1 if the last thermostat probe succeeded, else 0")
            .namespace("hvac")
    ).expect("metric can be created");
}

/// Add every collector to [`REGISTRY`]. Fails if called twice.
pub fn register_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(BACKEND_DURATION_SECONDS.clone()))?;

    REGISTRY.register(Box::new(CACHE_HITS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CACHE_MISSES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CACHE_SIZE.clone()))?;

    REGISTRY.register(Box::new(QUEUE_SIZE.clone()))?;
    REGISTRY.register(Box::new(QUEUE_WAIT_SECONDS.clone()))?;
    REGISTRY.register(Box::new(REQUESTS_REJECTED_TOTAL.clone()))?;

    REGISTRY.register(Box::new(BACKEND_HEALTHY.clone()))?;

    Ok(())
}

/// Render the registry in the Prometheus text exposition format
pub fn encode_metrics() -> String {
    TextEncoder::new()
        .encode_to_string(&REGISTRY.gather())
        .unwrap_or_else(|e| format!("# failed to encode metrics: {}", e))
}

/// Tracks one backend round-trip.
/// Counts as an error if dropped without an explicit outcome.
pub struct BackendTimer {
    method: String,
    start: std::time::Instant,
    finished: bool,
}

impl BackendTimer {
    /// Start timing a backend call for the given HTTP method.
    pub fn new(method: &str) -> Self {
        Self {
            method: method.to_string(),
            start: std::time::Instant::now(),
            finished: false,
        }
    }

    /// Record a completed round-trip.
    pub fn record_success(self) {
        self.finish("success");
    }

    /// Record a failed round-trip.
    pub fn record_failure(self) {
        self.finish("error");
    }

    fn finish(mut self, outcome: &str) {
        BACKEND_DURATION_SECONDS
            .with_label_values(&[&self.method])
            .observe(self.start.elapsed().as_secs_f64());
        REQUESTS_TOTAL
            .with_label_values(&[&self.method, outcome])
            .inc();
        self.finished = true;
    }
}

impl Drop for BackendTimer {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        REQUESTS_TOTAL
            .with_label_values(&[&self.method, "error"])
            .inc();
    }
}

/// Record a request answered from the cache.
pub fn record_cached_response(method: &str) {
    REQUESTS_TOTAL.with_label_values(&[method, "cached"]).inc();
}

/// Record a cache hit.
pub fn record_cache_hit() {
    CACHE_HITS_TOTAL.inc();
}

/// Record a cache miss.
pub fn record_cache_miss() {
    CACHE_MISSES_TOTAL.inc();
}

pub fn record_queue_wait(secs: f64) {
    QUEUE_WAIT_SECONDS.observe(secs);
}

pub fn set_queue_size(waiting: u64) {
    QUEUE_SIZE.set(waiting as f64);
}

/// Update cache size gauge.
pub fn set_cache_size(size: u64) {
    CACHE_SIZE.set(size as f64);
}

/// Count a request refused during shutdown
pub fn record_rejected() {
    REQUESTS_REJECTED_TOTAL.inc();
}

pub fn set_backend_healthy(healthy: bool) {
    BACKEND_HEALTHY.set(f64::from(u8::from(healthy)));
}
