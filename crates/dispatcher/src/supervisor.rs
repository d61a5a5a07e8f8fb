//! Dispatch supervisor - worker lifecycle and session teardown
//!
//! Owns the only path that may flush and close the shared session: after
//! every worker has joined, exactly once, flush before close. Interruption
//! during the join wait cancels workers cooperatively and still runs the
//! same teardown sequence.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, instrument, warn};

use contracts::{BrokerLink, DispatchError, TaskConfig};
use publisher::PublishSession;

use crate::cancel::CancelFlag;
use crate::source::FileSource;
use crate::worker::{run_worker, WorkerReport};

/// Aggregate result of one dispatch run
#[derive(Debug)]
pub struct RunSummary {
    /// Records handed to the session across all workers
    pub records_forwarded: u64,
    /// Per-record send failures across all workers
    pub failed_sends: u64,
    /// Workers spawned
    pub workers: usize,
    /// Workers that stopped on a terminal error
    pub failed_workers: usize,
    /// Workers that exited on cancellation
    pub cancelled_workers: usize,
    /// Wall-clock run time
    pub duration: Duration,
    /// Individual worker reports
    pub reports: Vec<WorkerReport>,
}

impl RunSummary {
    fn from_reports(reports: Vec<WorkerReport>, workers: usize, duration: Duration) -> Self {
        Self {
            records_forwarded: reports.iter().map(|r| r.records_forwarded).sum(),
            failed_sends: reports.iter().map(|r| r.failed_sends).sum(),
            workers,
            failed_workers: reports.iter().filter(|r| r.error.is_some()).count(),
            cancelled_workers: reports.iter().filter(|r| r.cancelled).count(),
            duration,
            reports,
        }
    }
}

/// Spawns one worker per task, joins all, then flushes and closes the session
pub struct Supervisor<B: BrokerLink + Send + Sync + 'static> {
    session: Arc<PublishSession<B>>,
    cancel: CancelFlag,
}

impl<B: BrokerLink + Send + Sync + 'static> Supervisor<B> {
    /// Take ownership of the session for this run
    pub fn new(session: PublishSession<B>) -> Self {
        Self {
            session: Arc::new(session),
            cancel: CancelFlag::new(),
        }
    }

    /// The shared session handle
    pub fn session(&self) -> &Arc<PublishSession<B>> {
        &self.session
    }

    /// Flag that cancels all workers of this run
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Run every task to completion, then flush and close the session
    pub async fn run_all(self, tasks: Vec<TaskConfig>) -> Result<RunSummary, DispatchError> {
        self.run_with_shutdown(tasks, std::future::pending()).await
    }

    /// Like [`run_all`](Self::run_all), interruptible by `shutdown`
    ///
    /// A completed shutdown future during the join wait propagates
    /// cancellation to all still-running workers; the join still completes
    /// and flush/close still run, exactly once, in that order.
    #[instrument(
        name = "dispatch_run",
        skip(self, tasks, shutdown),
        fields(tasks = tasks.len())
    )]
    pub async fn run_with_shutdown<F>(
        self,
        tasks: Vec<TaskConfig>,
        shutdown: F,
    ) -> Result<RunSummary, DispatchError>
    where
        F: Future<Output = ()>,
    {
        let start = Instant::now();
        let workers = tasks.len();
        info!(workers, session = %self.session.name(), "Starting dispatch workers");

        let mut handles = Vec::with_capacity(tasks.len());
        for task in tasks {
            let session = Arc::clone(&self.session);
            let cancel = self.cancel.clone();
            handles.push(tokio::spawn(dispatch_task(task, session, cancel)));
        }

        let join_all = async move {
            let mut reports = Vec::with_capacity(handles.len());
            for handle in handles {
                match handle.await {
                    Ok(report) => reports.push(report),
                    Err(e) => error!(error = ?e, "Worker task panicked"),
                }
            }
            reports
        };
        tokio::pin!(join_all);

        let reports = tokio::select! {
            reports = &mut join_all => reports,
            () = shutdown => {
                warn!("Interrupted during join wait, cancelling workers");
                self.cancel.cancel();
                join_all.await
            }
        };

        // Join barrier passed: flush, then close, exactly once. Close runs
        // even when flush fails.
        info!("All workers joined, flushing session");
        let flush_result = self.session.flush().await;
        if let Err(ref e) = flush_result {
            error!(error = %e, "Flush failed before close");
        }
        let close_result = self.session.close().await;

        flush_result?;
        close_result?;

        let summary = RunSummary::from_reports(reports, workers, start.elapsed());
        info!(
            records = summary.records_forwarded,
            failed_workers = summary.failed_workers,
            duration_secs = summary.duration.as_secs_f64(),
            "Dispatch run complete"
        );
        Ok(summary)
    }
}

/// One task: open its source, then drain it into the session
async fn dispatch_task<B: BrokerLink + Send + Sync + 'static>(
    task: TaskConfig,
    session: Arc<PublishSession<B>>,
    cancel: CancelFlag,
) -> WorkerReport {
    match FileSource::open(&task.file).await {
        Ok(source) => run_worker(task.id, source, task.topic, session, cancel).await,
        Err(e) => {
            error!(task = %task.id, error = %e, "Failed to open source");
            WorkerReport::failed(task.id, task.file.display().to_string(), e)
        }
    }
}
