//! Metrics module for the HVAC proxy
//!
//! Provides Prometheus metrics for monitoring and observability.

pub mod prometheus;

pub use self::prometheus::{
    encode_metrics, record_cache_hit, record_cache_miss, record_cached_response,
    record_queue_wait, record_rejected, register_metrics, set_backend_healthy, set_cache_size,
    set_queue_size, BackendTimer,
};
