//! Counters for the request queue.
//!
//! Every request is counted once in `received` and ends in exactly one of
//! `completed`, `failed` or `rejected`. Cache hits are completed requests
//! that are additionally counted in `cached`.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::time::{Duration, Instant};

fn add(counter: &AtomicU64, n: u64) -> u64 {
    counter.fetch_add(n, Relaxed) + n
}

fn sub(counter: &AtomicU64, n: u64) {
    // Gauges saturate at zero.
    let _ = counter.fetch_update(Relaxed, Relaxed, |v| Some(v.saturating_sub(n)));
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Live queue counters, shared between the queue and the metrics endpoint
#[derive(Debug, Default)]
pub struct QueueMetrics {
    received: AtomicU64,
    waiting: AtomicU64,
    in_flight: AtomicU64,
    completed: AtomicU64,
    cached: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    peak_waiting: AtomicU64,
    wait_ms_total: AtomicU64,
    busy_ms_total: AtomicU64,
}

impl QueueMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// A request was appended to the pending list
    pub fn record_queued(&self) {
        add(&self.received, 1);
        let waiting = add(&self.waiting, 1);
        self.peak_waiting.fetch_max(waiting, Relaxed);
    }

    /// The pass picked a request up after `waited`
    pub fn record_dequeued(&self, waited: Duration) {
        sub(&self.waiting, 1);
        add(&self.in_flight, 1);
        add(&self.wait_ms_total, millis(waited));
    }

    pub fn record_completed(&self, took: Duration) {
        sub(&self.in_flight, 1);
        add(&self.completed, 1);
        add(&self.busy_ms_total, millis(took));
    }

    /// Answered from the cache; also counted by `record_completed`
    pub fn record_cached(&self) {
        add(&self.cached, 1);
    }

    pub fn record_failed(&self, took: Duration) {
        sub(&self.in_flight, 1);
        add(&self.failed, 1);
        add(&self.busy_ms_total, millis(took));
    }

    /// Refused because the queue is closed
    pub fn record_rejected(&self) {
        add(&self.received, 1);
        add(&self.rejected, 1);
    }

    /// `count` waiting requests were answered with a shutdown error
    pub fn record_drained(&self, count: u64) {
        sub(&self.waiting, count);
        add(&self.rejected, count);
    }

    pub fn queue_depth(&self) -> u64 {
        self.waiting.load(Relaxed)
    }

    pub fn processing_count(&self) -> u64 {
        self.in_flight.load(Relaxed)
    }

    fn average(&self, total: &AtomicU64) -> f64 {
        let done = self.completed.load(Relaxed) + self.failed.load(Relaxed);
        match done {
            0 => 0.0,
            n => total.load(Relaxed) as f64 / n as f64,
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_received: self.received.load(Relaxed),
            requests_queued: self.waiting.load(Relaxed),
            requests_processing: self.in_flight.load(Relaxed),
            requests_completed: self.completed.load(Relaxed),
            requests_cached: self.cached.load(Relaxed),
            requests_failed: self.failed.load(Relaxed),
            requests_rejected: self.rejected.load(Relaxed),
            max_queue_depth: self.peak_waiting.load(Relaxed),
            avg_queue_wait_ms: self.average(&self.wait_ms_total),
            avg_processing_ms: self.average(&self.busy_ms_total),
        }
    }
}

/// Point-in-time copy of [`QueueMetrics`]
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_received: u64,
    pub requests_queued: u64,
    pub requests_processing: u64,
    pub requests_completed: u64,
    pub requests_cached: u64,
    pub requests_failed: u64,
    pub requests_rejected: u64,
    pub max_queue_depth: u64,
    pub avg_queue_wait_ms: f64,
    pub avg_processing_ms: f64,
}

/// Arrival and pickup times of one queued request
#[derive(Debug, Clone, Copy)]
pub struct RequestTimer {
    pub queued_at: Instant,
    pub started_at: Option<Instant>,
}

impl RequestTimer {
    pub fn new() -> Self {
        Self {
            queued_at: Instant::now(),
            started_at: None,
        }
    }

    pub fn start_processing(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Time between arrival and pickup (or now, if not picked up yet)
    pub fn queue_wait_time(&self) -> Duration {
        match self.started_at {
            Some(started) => started.duration_since(self.queued_at),
            None => self.queued_at.elapsed(),
        }
    }

    /// Time since pickup; zero before it
    pub fn processing_time(&self) -> Duration {
        self.started_at.map_or(Duration::ZERO, |s| s.elapsed())
    }
}

impl Default for RequestTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_lifecycle() {
        let metrics = QueueMetrics::new();

        metrics.record_queued();
        assert_eq!(metrics.queue_depth(), 1);

        metrics.record_dequeued(Duration::from_millis(100));
        assert_eq!(metrics.queue_depth(), 0);
        assert_eq!(metrics.processing_count(), 1);

        metrics.record_completed(Duration::from_millis(500));
        assert_eq!(metrics.processing_count(), 0);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_received, 1);
        assert_eq!(snapshot.requests_completed, 1);
        assert_eq!(snapshot.avg_queue_wait_ms, 100.0);
        assert_eq!(snapshot.avg_processing_ms, 500.0);
    }

    #[test]
    fn test_peak_depth_is_kept() {
        let metrics = QueueMetrics::new();

        for _ in 0..5 {
            metrics.record_queued();
        }
        for _ in 0..3 {
            metrics.record_dequeued(Duration::ZERO);
            metrics.record_completed(Duration::ZERO);
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.max_queue_depth, 5);
        assert_eq!(snapshot.requests_queued, 2);
    }

    #[test]
    fn test_failures_and_rejections() {
        let metrics = QueueMetrics::new();

        metrics.record_queued();
        metrics.record_queued();
        metrics.record_dequeued(Duration::ZERO);
        metrics.record_failed(Duration::from_millis(40));
        metrics.record_drained(1);
        metrics.record_rejected();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_received, 3);
        assert_eq!(snapshot.requests_failed, 1);
        assert_eq!(snapshot.requests_rejected, 2);
        assert_eq!(snapshot.requests_queued, 0);
        assert_eq!(snapshot.requests_processing, 0);
        assert_eq!(snapshot.avg_processing_ms, 40.0);
    }

    #[test]
    fn test_gauges_never_wrap() {
        let metrics = QueueMetrics::new();
        metrics.record_failed(Duration::ZERO);
        metrics.record_drained(3);

        assert_eq!(metrics.processing_count(), 0);
        assert_eq!(metrics.queue_depth(), 0);
    }

    #[test]
    fn test_timer_before_pickup() {
        let timer = RequestTimer::new();
        assert_eq!(timer.processing_time(), Duration::ZERO);
        assert!(timer.started_at.is_none());
    }
}
