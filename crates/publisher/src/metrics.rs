//! Session metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for one publish session
#[derive(Debug, Default)]
pub struct SessionMetrics {
    /// Records accepted into the publish queue
    enqueued: AtomicU64,
    /// Records acknowledged by the broker
    delivered: AtomicU64,
    /// Records that permanently failed delivery or never entered the queue
    failed: AtomicU64,
    /// Records currently between enqueue and acknowledgment
    in_flight: AtomicUsize,
}

impl SessionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get enqueued count
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Increment enqueued count
    pub fn inc_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Get delivered count
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Increment delivered count
    pub fn inc_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Get failed count
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Increment failed count
    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current in-flight count
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Record one record entering the queue
    pub fn inc_in_flight(&self) {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one record leaving the queue (acked or failed)
    pub fn dec_in_flight(&self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> SessionMetricsSnapshot {
        SessionMetricsSnapshot {
            enqueued: self.enqueued(),
            delivered: self.delivered(),
            failed: self.failed(),
            in_flight: self.in_flight(),
        }
    }
}

/// Snapshot of session metrics (for reporting)
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionMetricsSnapshot {
    pub enqueued: u64,
    pub delivered: u64,
    pub failed: u64,
    pub in_flight: usize,
}
