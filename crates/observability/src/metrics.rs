//! Dispatch metrics collection
//!
//! Thin helpers over the `metrics` facade, recorded by the CLI pipeline as
//! workers and transactions progress.

use metrics::{counter, gauge, histogram};

/// Record one record handed to the publish session
pub fn record_forwarded(task_id: &str, topic: &str) {
    counter!(
        "topic_relay_records_forwarded_total",
        "task" => task_id.to_string(),
        "topic" => topic.to_string()
    )
    .increment(1);
}

/// Record one per-record send failure
pub fn record_send_failed(task_id: &str, topic: &str) {
    counter!(
        "topic_relay_send_failures_total",
        "task" => task_id.to_string(),
        "topic" => topic.to_string()
    )
    .increment(1);
}

/// Record a finished worker
pub fn record_worker_finished(task_id: &str, records: u64, clean: bool) {
    let status = if clean { "success" } else { "failure" };
    counter!(
        "topic_relay_workers_finished_total",
        "task" => task_id.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("topic_relay_worker_records").record(records as f64);
}

/// Record a transaction outcome
pub fn record_transaction(committed: bool) {
    let outcome = if committed { "committed" } else { "aborted" };
    counter!(
        "topic_relay_transactions_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record the session's current in-flight depth
pub fn record_in_flight(depth: usize) {
    gauge!("topic_relay_records_in_flight").set(depth as f64);
}

/// Record total run duration
pub fn record_run_duration_secs(secs: f64) {
    histogram!("topic_relay_run_duration_secs").record(secs);
}
