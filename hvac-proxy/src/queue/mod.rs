//! Request serialization for the thermostat backend.
//!
//! The device behind the proxy handles one connection at a time and falls
//! over when several browser tabs poll it at once. Every proxied request
//! goes through a single [`RequestQueue`]:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │        /api/proxy/* handlers (any task)       │
//! └──────────────────────┬───────────────────────┘
//!                        │ submit()
//!               ┌────────▼────────┐
//!               │  VecDeque FIFO  │ ← pending + processing flag
//!               │  (one mutex)    │   under one lock
//!               └────────┬────────┘
//!                        │ one pass, one request at a time
//!               ┌────────▼────────┐
//!               │  ResponseCache  │ ← GET only, 1 s TTL
//!               └────────┬────────┘
//!                        │ miss / non-GET
//!               ┌────────▼────────┐
//!               │    Thermostat   │
//!               └─────────────────┘
//! ```
//!
//! - **Single flight**: at most one backend round-trip at any instant
//! - **FIFO**: nothing overtakes a request enqueued earlier
//! - **Isolation**: a failed round-trip fails only its own caller
//! - **No cancellation**: an entry is processed even if its caller left

mod fifo;
mod metrics;
mod request;

pub use fifo::{PendingResponse, QueueError, QueuedRequest, RequestQueue};
pub use metrics::{MetricsSnapshot, QueueMetrics, RequestTimer};
pub use request::{ProxyRequest, ProxyResponse, PROCESSING_FAILED_MESSAGE};
