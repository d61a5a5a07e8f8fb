//! PublishSession - the single long-lived producer handle
//!
//! One session exists per run. `send` is safe for concurrent worker tasks;
//! `flush`/`close` must only run after every worker has joined, which the
//! dispatch supervisor enforces. All publishes and transaction control ops
//! travel through one bounded FIFO queue drained by a single worker task,
//! so records sent by one task keep their order and control ops land after
//! every send that preceded them.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, trace};

use contracts::{
    BrokerConfig, BrokerLink, DeliveryReport, DispatchError, Record, SerializerKind, WireRecord,
};

use crate::metrics::SessionMetrics;
use crate::serializer;

const STATE_UNINITIALIZED: u8 = 0;
const STATE_READY: u8 = 1;
const STATE_CLOSED: u8 = 2;

/// Queue operations processed by the session worker
enum Op {
    Publish {
        record: WireRecord,
        ack: oneshot::Sender<Result<DeliveryReport, DispatchError>>,
    },
    Begin {
        ack: oneshot::Sender<Result<(), DispatchError>>,
    },
    Commit {
        ack: oneshot::Sender<Result<(), DispatchError>>,
    },
    Abort {
        ack: oneshot::Sender<Result<(), DispatchError>>,
    },
    Flush {
        ack: oneshot::Sender<()>,
    },
}

/// Resolves to the broker acknowledgment for one sent record
///
/// Dropping the handle is allowed (fire-and-forget); the session still
/// tracks and logs the delivery outcome.
pub struct DeliveryHandle {
    rx: oneshot::Receiver<Result<DeliveryReport, DispatchError>>,
}

impl DeliveryHandle {
    /// Wait for the broker acknowledgment
    pub async fn wait(self) -> Result<DeliveryReport, DispatchError> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(DispatchError::state(
                "session closed before delivery resolved",
            )),
        }
    }
}

/// The shared producer handle
///
/// Lifecycle: `Uninitialized -> Ready -> Closed` (non-transactional sessions
/// start `Ready`). Closing twice is an error, as is any send after close.
pub struct PublishSession<B: BrokerLink + Send + Sync + 'static> {
    name: String,
    transactional: bool,
    key_serializer: SerializerKind,
    value_serializer: SerializerKind,
    send_timeout: Duration,
    state: AtomicU8,
    txn_open: AtomicBool,
    tx: Mutex<Option<mpsc::Sender<Op>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    broker: Arc<B>,
    metrics: Arc<SessionMetrics>,
}

impl<B: BrokerLink + Send + Sync + 'static> PublishSession<B> {
    /// Open a session over the given broker link
    ///
    /// # Errors
    /// `Config` when the endpoint list is empty or the client identity is
    /// blank. A transactional identity puts the session in transactional
    /// mode: `init_transactions` must run before any send.
    pub fn open(config: &BrokerConfig, broker: B) -> Result<Self, DispatchError> {
        if config.bootstrap_servers.is_empty() {
            return Err(DispatchError::config(
                "broker.bootstrap_servers",
                "at least one endpoint is required",
            ));
        }
        if config.client_id.trim().is_empty() {
            return Err(DispatchError::config(
                "broker.client_id",
                "client_id cannot be empty",
            ));
        }
        if config.queue_capacity == 0 {
            return Err(DispatchError::config(
                "broker.queue_capacity",
                "queue_capacity must be > 0",
            ));
        }

        let transactional = config.transactional_id.is_some();
        let broker = Arc::new(broker);
        let metrics = Arc::new(SessionMetrics::new());
        let (tx, rx) = mpsc::channel(config.queue_capacity);

        let worker_broker = Arc::clone(&broker);
        let worker_metrics = Arc::clone(&metrics);
        let worker_name = config.client_id.clone();
        let worker = tokio::spawn(async move {
            session_worker(worker_broker, rx, worker_metrics, worker_name).await;
        });

        debug!(
            session = %config.client_id,
            transactional,
            queue_capacity = config.queue_capacity,
            "Publish session opened"
        );

        Ok(Self {
            name: config.client_id.clone(),
            transactional,
            key_serializer: config.key_serializer,
            value_serializer: config.value_serializer,
            send_timeout: config.send_timeout(),
            state: AtomicU8::new(if transactional {
                STATE_UNINITIALIZED
            } else {
                STATE_READY
            }),
            txn_open: AtomicBool::new(false),
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            broker,
            metrics,
        })
    }

    /// Session name (the client identity)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the session runs in transactional mode
    pub fn is_transactional(&self) -> bool {
        self.transactional
    }

    /// Whether a transaction is currently open
    pub fn transaction_open(&self) -> bool {
        self.txn_open.load(Ordering::Acquire)
    }

    /// Session metrics
    pub fn metrics(&self) -> &Arc<SessionMetrics> {
        &self.metrics
    }

    /// Enqueue a record for delivery
    ///
    /// Applies backpressure as a bounded wait up to the configured send
    /// timeout when the queue is full, then fails with a delivery error.
    ///
    /// # Errors
    /// - `SendOnClosedSession` after close
    /// - `State` on a transactional session before `init_transactions`, or
    ///   while no transaction is open
    /// - `Delivery` on serializer mismatch or queue-full timeout
    pub async fn send(&self, record: Record) -> Result<DeliveryHandle, DispatchError> {
        match self.state.load(Ordering::Acquire) {
            STATE_CLOSED => return Err(DispatchError::send_on_closed(record.topic)),
            STATE_UNINITIALIZED => {
                return Err(DispatchError::state(
                    "transactional session requires init_transactions before send",
                ))
            }
            _ => {}
        }
        if self.transactional && !self.txn_open.load(Ordering::Acquire) {
            return Err(DispatchError::state("send requires an open transaction"));
        }

        let wire = serializer::encode(&record, self.key_serializer, self.value_serializer)?;
        let topic = wire.topic.clone();

        let sender = match self.tx.lock().await.as_ref() {
            Some(sender) => sender.clone(),
            None => return Err(DispatchError::send_on_closed(topic)),
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        self.metrics.inc_enqueued();
        self.metrics.inc_in_flight();

        match sender
            .send_timeout(
                Op::Publish {
                    record: wire,
                    ack: ack_tx,
                },
                self.send_timeout,
            )
            .await
        {
            Ok(()) => Ok(DeliveryHandle { rx: ack_rx }),
            Err(SendTimeoutError::Timeout(_)) => {
                self.metrics.dec_in_flight();
                self.metrics.inc_failed();
                Err(DispatchError::delivery(
                    topic,
                    format!("publish queue full after {:?}", self.send_timeout),
                ))
            }
            Err(SendTimeoutError::Closed(_)) => {
                self.metrics.dec_in_flight();
                Err(DispatchError::send_on_closed(topic))
            }
        }
    }

    /// Block until every previously enqueued record is acked or has
    /// permanently failed
    pub async fn flush(&self) -> Result<(), DispatchError> {
        let sender = match self.tx.lock().await.as_ref() {
            Some(sender) => sender.clone(),
            None => return Err(DispatchError::state("flush on closed session")),
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        sender
            .send(Op::Flush { ack: ack_tx })
            .await
            .map_err(|_| DispatchError::state("flush on closed session"))?;
        ack_rx
            .await
            .map_err(|_| DispatchError::state("session worker stopped during flush"))
    }

    /// Release the connection
    ///
    /// Exactly-once: a second close is a `State` error. The op queue is
    /// drained before the broker link disconnects.
    #[instrument(name = "session_close", skip(self), fields(session = %self.name))]
    pub async fn close(&self) -> Result<(), DispatchError> {
        if self.state.swap(STATE_CLOSED, Ordering::AcqRel) == STATE_CLOSED {
            return Err(DispatchError::state("session already closed"));
        }

        self.tx.lock().await.take();
        let worker = self.worker.lock().await.take();
        if let Some(handle) = worker {
            if let Err(e) = handle.await {
                error!(session = %self.name, error = ?e, "Session worker panicked");
            }
        }

        let result = self.broker.disconnect().await;
        debug!(session = %self.name, "Publish session closed");
        result
    }

    /// Fence previous incarnations and make the transactional session ready
    ///
    /// # Errors
    /// `State` on a non-transactional session or when already initialized.
    pub async fn init_transactions(&self) -> Result<(), DispatchError> {
        if !self.transactional {
            return Err(DispatchError::state("session is not transactional"));
        }
        match self.state.load(Ordering::Acquire) {
            STATE_UNINITIALIZED => {}
            STATE_CLOSED => return Err(DispatchError::state("session already closed")),
            _ => return Err(DispatchError::state("transactions already initialized")),
        }

        self.broker.init_transactions().await?;
        self.state.store(STATE_READY, Ordering::Release);
        debug!(session = %self.name, "Transactions initialized");
        Ok(())
    }

    /// Open a transaction
    ///
    /// # Errors
    /// `State` on nested begin, before init, or on a non-transactional
    /// session.
    pub async fn begin_transaction(&self) -> Result<(), DispatchError> {
        self.ensure_transactional_ready()?;
        if self.txn_open.swap(true, Ordering::AcqRel) {
            return Err(DispatchError::state("transaction already open"));
        }

        match self.control(|ack| Op::Begin { ack }).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.txn_open.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    /// Commit the open transaction
    ///
    /// Ordered after every send that preceded it. On failure the
    /// transaction stays open so the caller's abort passes the state guard.
    pub async fn commit_transaction(&self) -> Result<(), DispatchError> {
        self.ensure_transactional_ready()?;
        if !self.txn_open.load(Ordering::Acquire) {
            return Err(DispatchError::state("no open transaction to commit"));
        }

        self.control(|ack| Op::Commit { ack }).await?;
        self.txn_open.store(false, Ordering::Release);
        Ok(())
    }

    /// Abort the open transaction, discarding its buffered records
    pub async fn abort_transaction(&self) -> Result<(), DispatchError> {
        self.ensure_transactional_ready()?;
        if !self.txn_open.swap(false, Ordering::AcqRel) {
            return Err(DispatchError::state("no open transaction to abort"));
        }

        self.control(|ack| Op::Abort { ack }).await
    }

    fn ensure_transactional_ready(&self) -> Result<(), DispatchError> {
        if !self.transactional {
            return Err(DispatchError::state("session is not transactional"));
        }
        match self.state.load(Ordering::Acquire) {
            STATE_READY => Ok(()),
            STATE_CLOSED => Err(DispatchError::state("session already closed")),
            _ => Err(DispatchError::state("transactions not initialized")),
        }
    }

    /// Run one transaction control op through the queue and wait for it
    async fn control<F>(&self, make_op: F) -> Result<(), DispatchError>
    where
        F: FnOnce(oneshot::Sender<Result<(), DispatchError>>) -> Op,
    {
        let sender = match self.tx.lock().await.as_ref() {
            Some(sender) => sender.clone(),
            None => return Err(DispatchError::state("session already closed")),
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        sender
            .send(make_op(ack_tx))
            .await
            .map_err(|_| DispatchError::state("session already closed"))?;
        ack_rx
            .await
            .map_err(|_| DispatchError::state("session worker stopped"))?
    }
}

/// Worker task that drains the op queue against the broker link
#[instrument(
    name = "session_worker_loop",
    skip(broker, rx, metrics),
    fields(session = %name)
)]
async fn session_worker<B: BrokerLink>(
    broker: Arc<B>,
    mut rx: mpsc::Receiver<Op>,
    metrics: Arc<SessionMetrics>,
    name: String,
) {
    debug!(session = %name, "Session worker started");

    while let Some(op) = rx.recv().await {
        match op {
            Op::Publish { record, ack } => {
                let topic = record.topic.clone();
                let result = broker.deliver(record).await;
                metrics.dec_in_flight();
                match &result {
                    Ok(report) => {
                        metrics.inc_delivered();
                        trace!(
                            session = %name,
                            topic = %report.topic,
                            partition = report.partition,
                            offset = report.offset,
                            "Record delivered"
                        );
                    }
                    Err(e) => {
                        metrics.inc_failed();
                        error!(session = %name, topic = %topic, error = %e, "Delivery failed");
                        // Siblings keep sending - per-record failures never stop the queue
                    }
                }
                let _ = ack.send(result);
            }
            Op::Begin { ack } => {
                let _ = ack.send(broker.begin_transaction().await);
            }
            Op::Commit { ack } => {
                let _ = ack.send(broker.commit_transaction().await);
            }
            Op::Abort { ack } => {
                let _ = ack.send(broker.abort_transaction().await);
            }
            Op::Flush { ack } => {
                let _ = ack.send(());
            }
        }
    }

    debug!(session = %name, "Session worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBroker;
    use contracts::FieldValue;

    fn test_config(transactional: bool) -> BrokerConfig {
        BrokerConfig {
            bootstrap_servers: vec!["localhost:9092".into()],
            client_id: "test-session".into(),
            key_serializer: SerializerKind::Integer,
            value_serializer: SerializerKind::Text,
            transactional_id: transactional.then(|| "test-txn-id".into()),
            queue_capacity: 16,
            send_timeout_ms: 100,
        }
    }

    #[tokio::test]
    async fn test_send_flush_close() {
        let broker = MemoryBroker::new("mem");
        let session = PublishSession::open(&test_config(false), broker.clone()).unwrap();

        for i in 0..5 {
            let handle = session
                .send(Record::value_only("events", format!("line {i}")))
                .await
                .unwrap();
            drop(handle);
        }

        session.flush().await.unwrap();
        assert_eq!(broker.visible_count("events"), 5);
        assert_eq!(session.metrics().delivered(), 5);
        assert_eq!(session.metrics().in_flight(), 0);

        session.close().await.unwrap();
        assert_eq!(broker.disconnect_count(), 1);
    }

    #[tokio::test]
    async fn test_delivery_handle_resolves_with_offset() {
        let broker = MemoryBroker::new("mem");
        let session = PublishSession::open(&test_config(false), broker).unwrap();

        let first = session
            .send(Record::keyed("events", 1, "a"))
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();
        let second = session
            .send(Record::keyed("events", 2, "b"))
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert_eq!(first.offset, 0);
        assert_eq!(second.offset, 1);
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_twice_is_state_error() {
        let broker = MemoryBroker::new("mem");
        let session = PublishSession::open(&test_config(false), broker).unwrap();

        session.close().await.unwrap();
        let result = session.close().await;
        assert!(matches!(result, Err(DispatchError::State { .. })));
    }

    #[tokio::test]
    async fn test_send_after_close() {
        let broker = MemoryBroker::new("mem");
        let session = PublishSession::open(&test_config(false), broker).unwrap();
        session.close().await.unwrap();

        let result = session.send(Record::value_only("events", "late")).await;
        assert!(matches!(
            result,
            Err(DispatchError::SendOnClosedSession { ref topic }) if topic == "events"
        ));
    }

    #[tokio::test]
    async fn test_transactional_send_before_init() {
        let broker = MemoryBroker::new("mem");
        let session = PublishSession::open(&test_config(true), broker).unwrap();

        let result = session.send(Record::value_only("events", "early")).await;
        assert!(matches!(result, Err(DispatchError::State { .. })));
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_transactional_send_requires_open_transaction() {
        let broker = MemoryBroker::new("mem");
        let session = PublishSession::open(&test_config(true), broker).unwrap();
        session.init_transactions().await.unwrap();

        let result = session.send(Record::value_only("events", "stray")).await;
        assert!(matches!(result, Err(DispatchError::State { .. })));
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_transaction_ops_on_plain_session() {
        let broker = MemoryBroker::new("mem");
        let session = PublishSession::open(&test_config(false), broker).unwrap();

        assert!(session.init_transactions().await.is_err());
        assert!(session.begin_transaction().await.is_err());
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_backpressure_bounded_wait() {
        let broker =
            MemoryBroker::with_deliver_delay("slow", std::time::Duration::from_millis(500));
        let mut config = test_config(false);
        config.queue_capacity = 1;
        config.send_timeout_ms = 50;
        let session = PublishSession::open(&config, broker).unwrap();

        // First record occupies the worker, second fills the queue slot
        let _ = session.send(Record::value_only("events", "a")).await.unwrap();
        let _ = session.send(Record::value_only("events", "b")).await.unwrap();

        let result = session.send(Record::value_only("events", "c")).await;
        assert!(matches!(result, Err(DispatchError::Delivery { .. })));

        session.flush().await.unwrap();
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_serializer_mismatch_is_per_record() {
        let broker = MemoryBroker::new("mem");
        let session = PublishSession::open(&test_config(false), broker.clone()).unwrap();

        let bad = session
            .send(Record {
                topic: "events".into(),
                key: Some(FieldValue::Text("not-an-int".into())),
                value: FieldValue::Text("v".into()),
            })
            .await;
        assert!(matches!(bad, Err(DispatchError::Delivery { .. })));

        // The session keeps working for well-formed records
        session
            .send(Record::value_only("events", "fine"))
            .await
            .unwrap();
        session.flush().await.unwrap();
        assert_eq!(broker.visible_count("events"), 1);
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_rejects_empty_endpoints() {
        let mut config = test_config(false);
        config.bootstrap_servers.clear();
        let result = PublishSession::open(&config, MemoryBroker::new("mem"));
        assert!(matches!(result, Err(DispatchError::Config { .. })));
    }
}
