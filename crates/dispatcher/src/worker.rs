//! Dispatch worker - drains one record source into the shared session
//!
//! Workers forward records fire-and-forget and never touch the session
//! lifecycle; flush/close belong to the supervisor after the join barrier.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use contracts::{BrokerLink, DispatchError, Record, RecordSource};
use publisher::PublishSession;

use crate::cancel::CancelFlag;

/// Final report from one dispatch worker
#[derive(Debug)]
pub struct WorkerReport {
    /// Task identifier
    pub task_id: String,
    /// Source origin (file path)
    pub origin: String,
    /// Records handed to the session
    pub records_forwarded: u64,
    /// Per-record send failures (backpressure timeouts, serializer errors)
    pub failed_sends: u64,
    /// Terminal error, when the worker stopped early
    pub error: Option<String>,
    /// Whether the worker exited on cancellation
    pub cancelled: bool,
}

impl WorkerReport {
    /// Report for a worker that never got its source open
    pub fn failed(task_id: String, origin: String, error: DispatchError) -> Self {
        Self {
            task_id,
            origin,
            records_forwarded: 0,
            failed_sends: 0,
            error: Some(error.to_string()),
            cancelled: false,
        }
    }
}

/// Drain `source` into `session`, one record per line, topic fixed per task
///
/// - Per-record send failures are logged and counted; siblings and the rest
///   of this source are unaffected
/// - Source read failures terminate this worker only
/// - Lifecycle errors (`SendOnClosedSession`, `State`) terminate the worker:
///   they mean the join-before-close ordering was broken upstream
/// - The cancel flag is checked between records
#[instrument(
    name = "dispatch_worker",
    skip(source, session, cancel),
    fields(task = %task_id, topic = %topic)
)]
pub async fn run_worker<B, S>(
    task_id: String,
    mut source: S,
    topic: String,
    session: Arc<PublishSession<B>>,
    cancel: CancelFlag,
) -> WorkerReport
where
    B: BrokerLink + Send + Sync + 'static,
    S: RecordSource,
{
    info!(task = %task_id, source = %source.origin(), topic = %topic, "Start processing source");

    let origin = source.origin().to_string();
    let mut report = WorkerReport {
        task_id,
        origin,
        records_forwarded: 0,
        failed_sends: 0,
        error: None,
        cancelled: false,
    };

    loop {
        if cancel.is_cancelled() {
            warn!(task = %report.task_id, "Cancelled, stopping between records");
            report.cancelled = true;
            break;
        }

        let line = match source.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!(task = %report.task_id, source = %report.origin, error = %e, "Error processing source");
                report.error = Some(e.to_string());
                break;
            }
        };

        match session.send(Record::value_only(topic.clone(), line)).await {
            // Fire-and-forget: the session tracks and logs the delivery outcome
            Ok(_handle) => report.records_forwarded += 1,
            Err(e @ DispatchError::Delivery { .. }) => {
                warn!(task = %report.task_id, error = %e, "Record send failed, continuing");
                report.failed_sends += 1;
            }
            Err(e) => {
                error!(task = %report.task_id, error = %e, "Session unusable, stopping worker");
                report.error = Some(e.to_string());
                break;
            }
        }
    }

    info!(
        task = %report.task_id,
        source = %report.origin,
        records = report.records_forwarded,
        "Completed processing source"
    );
    report
}
