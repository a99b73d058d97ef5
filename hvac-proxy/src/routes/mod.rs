//! HTTP route handlers for the HVAC proxy.
//!
//! - `proxy`: the queued pass-through to the thermostat
//! - `health`: health check and metrics endpoints

pub mod health;
pub mod proxy;

pub use health::{health, live, metrics, metrics_prometheus};
pub use proxy::proxy;
