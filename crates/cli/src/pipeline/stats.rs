//! Dispatch run statistics.

use std::time::Duration;

use dispatcher::RunSummary;
use publisher::SessionMetricsSnapshot;

/// Statistics from a dispatch run
#[derive(Debug, Clone, Default)]
pub struct DispatchStats {
    /// Records handed to the publish session
    pub records_forwarded: u64,

    /// Per-record send failures
    pub failed_sends: u64,

    /// Workers spawned (0 in transactional mode)
    pub workers: usize,

    /// Workers that stopped on a terminal error
    pub failed_workers: usize,

    /// Workers that exited on cancellation
    pub cancelled_workers: usize,

    /// Whether the run was transactional
    pub transactional: bool,

    /// Transaction outcome (None outside transactional mode)
    pub committed: Option<bool>,

    /// Total duration of the run
    pub duration: Duration,

    /// Session-level delivery counters
    pub session: SessionMetricsSnapshot,
}

impl DispatchStats {
    /// Build stats from a supervisor run
    pub fn from_summary(summary: &RunSummary, session: SessionMetricsSnapshot) -> Self {
        Self {
            records_forwarded: summary.records_forwarded,
            failed_sends: summary.failed_sends,
            workers: summary.workers,
            failed_workers: summary.failed_workers,
            cancelled_workers: summary.cancelled_workers,
            transactional: false,
            committed: None,
            duration: summary.duration,
            session,
        }
    }

    /// Records per second throughput
    pub fn records_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.records_forwarded as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Dispatch Statistics ===\n");

        println!("Overview");
        println!("   |- Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   |- Records forwarded: {}", self.records_forwarded);
        println!("   |- Records/s: {:.2}", self.records_per_sec());
        if self.transactional {
            let outcome = match self.committed {
                Some(true) => "committed",
                Some(false) => "aborted",
                None => "none",
            };
            println!("   `- Transaction: {}", outcome);
        } else {
            println!("   |- Workers: {}", self.workers);
            println!("   |- Failed workers: {}", self.failed_workers);
            println!("   `- Cancelled workers: {}", self.cancelled_workers);
        }

        println!("\nSession");
        println!("   |- Enqueued: {}", self.session.enqueued);
        println!("   |- Delivered: {}", self.session.delivered);
        println!("   |- Failed: {}", self.session.failed);
        println!("   `- In flight: {}", self.session.in_flight);

        println!();
    }
}
