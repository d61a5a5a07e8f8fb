//! Dispatch orchestrator - coordinates the session, workers, and teardown.
//!
//! Supports both a real Kafka broker and the in-memory broker via the
//! `kafka` feature. When the feature is disabled, runs against the
//! in-memory broker.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use contracts::{BrokerLink, DispatchPlan, Record, RecordSource, TaskConfig};
use dispatcher::{CancelFlag, FileSource, Supervisor};
use publisher::{PublishSession, TransactionCoordinator, TxnOutcome};

use super::DispatchStats;

/// Run options from the CLI
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Abort the run after this long (None = unlimited)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Run a dispatch plan to completion
#[cfg(feature = "kafka")]
pub async fn run_plan(plan: DispatchPlan, options: RunOptions) -> Result<DispatchStats> {
    use publisher::KafkaBroker;

    init_metrics(&options)?;

    info!(
        servers = %plan.broker.bootstrap_servers.join(","),
        client_id = %plan.broker.client_id,
        "Connecting Kafka producer"
    );
    let broker = KafkaBroker::connect(&plan.broker).context("Failed to create Kafka producer")?;

    run_with_broker(plan, broker, options).await
}

/// Run a dispatch plan against the in-memory broker
#[cfg(not(feature = "kafka"))]
pub async fn run_plan(plan: DispatchPlan, options: RunOptions) -> Result<DispatchStats> {
    use publisher::MemoryBroker;

    init_metrics(&options)?;

    info!("Running against the in-memory broker (no `kafka` feature)");
    let broker = MemoryBroker::new(plan.broker.client_id.clone());

    run_with_broker(plan, broker, options).await
}

fn init_metrics(options: &RunOptions) -> Result<()> {
    if let Some(port) = options.metrics_port {
        observability::init_metrics_only(port)?;
        info!("Metrics endpoint available on port {}", port);
    }
    Ok(())
}

/// Common orchestration shared by both broker links
async fn run_with_broker<B: BrokerLink + Send + Sync + 'static>(
    plan: DispatchPlan,
    broker: B,
    options: RunOptions,
) -> Result<DispatchStats> {
    let transactional = plan.broker.transactional_id.is_some();
    let session =
        PublishSession::open(&plan.broker, broker).context("Failed to open publish session")?;

    info!(
        session = %session.name(),
        transactional,
        tasks = plan.tasks.len(),
        "Publish session ready"
    );

    if transactional {
        run_transactional(session, plan.tasks).await
    } else {
        run_shared(session, plan.tasks, options).await
    }
}

/// Shared mode: one worker per task over the shared session
async fn run_shared<B: BrokerLink + Send + Sync + 'static>(
    session: PublishSession<B>,
    tasks: Vec<TaskConfig>,
    options: RunOptions,
) -> Result<DispatchStats> {
    let supervisor = Supervisor::new(session);
    let metrics = Arc::clone(supervisor.session().metrics());

    let timeout = options.timeout;
    let shutdown = async move {
        match timeout {
            Some(limit) => {
                tokio::select! {
                    () = shutdown_signal() => {}
                    () = tokio::time::sleep(limit) => {
                        warn!(timeout_secs = limit.as_secs(), "Run timed out");
                    }
                }
            }
            None => shutdown_signal().await,
        }
    };

    let summary = supervisor
        .run_with_shutdown(tasks, shutdown)
        .await
        .context("Dispatch run failed")?;

    for report in &summary.reports {
        observability::record_worker_finished(
            &report.task_id,
            report.records_forwarded,
            report.error.is_none(),
        );
    }
    observability::record_run_duration_secs(summary.duration.as_secs_f64());

    Ok(DispatchStats::from_summary(&summary, metrics.snapshot()))
}

/// Transactional mode: all tasks dispatched sequentially inside one
/// transaction, atomic across every file and topic
async fn run_transactional<B: BrokerLink + Send + Sync + 'static>(
    session: PublishSession<B>,
    tasks: Vec<TaskConfig>,
) -> Result<DispatchStats> {
    let start = Instant::now();
    let cancel = CancelFlag::new();

    let signal_cancel = cancel.clone();
    let signal_watcher = tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Shutdown signal received, aborting open transaction");
        signal_cancel.cancel();
    });

    let mut txn = TransactionCoordinator::init(session)
        .await
        .context("Failed to initialize transactions")?;

    let run_result = drive_transaction(&mut txn, &tasks, &cancel).await;
    signal_watcher.abort();

    // Teardown runs on every path; the transaction is back at Idle here
    let session = txn.into_session();
    let metrics = Arc::clone(session.metrics());
    let flush_result = session.flush().await;
    if let Err(ref e) = flush_result {
        error!(error = %e, "Flush failed before close");
    }
    let close_result = session.close().await;

    let outcome = run_result?;
    flush_result.context("Flush failed")?;
    close_result.context("Close failed")?;

    let (committed, forwarded) = match outcome {
        TxnRunOutcome::Committed(n) => (true, n),
        TxnRunOutcome::Interrupted(n) => (false, n),
    };

    observability::record_run_duration_secs(start.elapsed().as_secs_f64());

    Ok(DispatchStats {
        records_forwarded: forwarded,
        failed_sends: 0,
        workers: 0,
        failed_workers: 0,
        cancelled_workers: 0,
        transactional: true,
        committed: Some(committed),
        duration: start.elapsed(),
        session: metrics.snapshot(),
    })
}

enum TxnRunOutcome {
    Committed(u64),
    Interrupted(u64),
}

/// Send every task's records inside one transaction, then commit
///
/// Every failure path resolves through abort before the error propagates,
/// so the coordinator is back at Idle when this returns.
async fn drive_transaction<B: BrokerLink + Send + Sync + 'static>(
    txn: &mut TransactionCoordinator<B>,
    tasks: &[TaskConfig],
    cancel: &CancelFlag,
) -> Result<TxnRunOutcome> {
    txn.begin().await.context("Failed to begin transaction")?;
    info!(tasks = tasks.len(), "Transaction open");

    let mut forwarded = 0u64;

    for task in tasks {
        let mut source = match FileSource::open(&task.file).await {
            Ok(source) => source,
            Err(e) => {
                txn.abort().await.ok();
                observability::record_transaction(false);
                return Err(e).context("Failed to open source inside transaction");
            }
        };

        info!(task = %task.id, source = %source.origin(), topic = %task.topic, "Dispatching task");

        loop {
            if cancel.is_cancelled() {
                txn.abort().await.context("Abort on cancellation failed")?;
                observability::record_transaction(false);
                return Ok(TxnRunOutcome::Interrupted(forwarded));
            }

            match source.next_line().await {
                Ok(Some(line)) => {
                    // A failed send has already aborted by the time the error surfaces
                    let _ = txn
                        .send(Record::value_only(task.topic.clone(), line))
                        .await
                        .context("Send inside transaction failed")?;
                    forwarded += 1;
                    observability::record_forwarded(&task.id, &task.topic);
                }
                Ok(None) => break,
                Err(e) => {
                    txn.abort().await.ok();
                    observability::record_transaction(false);
                    return Err(e).context("Source read failed inside transaction");
                }
            }
        }
    }

    match txn.commit().await? {
        TxnOutcome::Committed => {
            observability::record_transaction(true);
            info!(records = forwarded, "Transaction committed");
            Ok(TxnRunOutcome::Committed(forwarded))
        }
        TxnOutcome::Aborted(cause) => {
            observability::record_transaction(false);
            Err(cause).context("Transaction commit failed and was aborted")
        }
    }
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
