//! In-memory broker link
//!
//! Used for tests and for running without a broker. Mirrors broker
//! transaction semantics: records delivered inside an open transaction are
//! staged invisible until commit, and aborted records still consume offsets.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use contracts::{BrokerLink, DeliveryReport, DispatchError, WireRecord};

/// A record as stored by the in-memory broker
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub topic: String,
    pub key: Option<Bytes>,
    pub payload: Bytes,
    pub offset: i64,
}

#[derive(Default)]
struct MemoryLog {
    visible: HashMap<String, Vec<StoredRecord>>,
    pending: Vec<StoredRecord>,
    log_end: HashMap<String, i64>,
    in_txn: bool,
}

struct MemoryInner {
    name: String,
    log: Mutex<MemoryLog>,
    connected: AtomicBool,
    txn_ready: AtomicBool,
    fail_next_commit: AtomicBool,
    fail_deliveries: AtomicBool,
    disconnects: AtomicU64,
    deliver_delay: Option<Duration>,
}

/// In-memory broker link, cheaply cloneable (all clones share one log)
#[derive(Clone)]
pub struct MemoryBroker {
    inner: Arc<MemoryInner>,
}

impl MemoryBroker {
    /// Create a new in-memory broker
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name, None)
    }

    /// Create a broker that delays every delivery, to exercise backpressure
    /// and slow-broker paths
    pub fn with_deliver_delay(name: impl Into<String>, delay: Duration) -> Self {
        Self::build(name, Some(delay))
    }

    fn build(name: impl Into<String>, deliver_delay: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                name: name.into(),
                log: Mutex::new(MemoryLog::default()),
                connected: AtomicBool::new(true),
                txn_ready: AtomicBool::new(false),
                fail_next_commit: AtomicBool::new(false),
                fail_deliveries: AtomicBool::new(false),
                disconnects: AtomicU64::new(0),
                deliver_delay,
            }),
        }
    }

    /// Make the next commit fail (the transaction stays open for abort)
    pub fn induce_commit_failure(&self) {
        self.inner.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Make every delivery fail until cleared
    pub fn set_fail_deliveries(&self, fail: bool) {
        self.inner.fail_deliveries.store(fail, Ordering::SeqCst);
    }

    /// Count of committed/visible records on one topic
    pub fn visible_count(&self, topic: &str) -> usize {
        let log = self.lock_log();
        log.visible.get(topic).map(Vec::len).unwrap_or(0)
    }

    /// Count of committed/visible records across all topics
    pub fn total_visible(&self) -> usize {
        let log = self.lock_log();
        log.visible.values().map(Vec::len).sum()
    }

    /// Visible record payloads on one topic, decoded as UTF-8
    pub fn visible_values(&self, topic: &str) -> Vec<String> {
        let log = self.lock_log();
        log.visible
            .get(topic)
            .map(|records| {
                records
                    .iter()
                    .map(|r| String::from_utf8_lossy(&r.payload).into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// How many times the link was disconnected
    pub fn disconnect_count(&self) -> u64 {
        self.inner.disconnects.load(Ordering::SeqCst)
    }

    fn lock_log(&self) -> std::sync::MutexGuard<'_, MemoryLog> {
        // The log mutex is never held across an await and never poisoned
        match self.inner.log.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl BrokerLink for MemoryBroker {
    fn name(&self) -> &str {
        &self.inner.name
    }

    async fn deliver(&self, record: WireRecord) -> Result<DeliveryReport, DispatchError> {
        if let Some(delay) = self.inner.deliver_delay {
            tokio::time::sleep(delay).await;
        }
        if !self.inner.connected.load(Ordering::SeqCst) {
            return Err(DispatchError::delivery(record.topic, "link disconnected"));
        }
        if self.inner.fail_deliveries.load(Ordering::SeqCst) {
            return Err(DispatchError::delivery(record.topic, "induced failure"));
        }

        let mut log = self.lock_log();
        let offset_slot = log.log_end.entry(record.topic.clone()).or_insert(0);
        let offset = *offset_slot;
        *offset_slot += 1;

        let stored = StoredRecord {
            topic: record.topic.clone(),
            key: record.key,
            payload: record.payload,
            offset,
        };
        if log.in_txn {
            log.pending.push(stored);
        } else {
            log.visible.entry(record.topic.clone()).or_default().push(stored);
        }

        Ok(DeliveryReport {
            topic: record.topic,
            partition: 0,
            offset,
        })
    }

    async fn init_transactions(&self) -> Result<(), DispatchError> {
        if !self.inner.connected.load(Ordering::SeqCst) {
            return Err(DispatchError::transaction("link disconnected"));
        }
        self.inner.txn_ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn begin_transaction(&self) -> Result<(), DispatchError> {
        if !self.inner.txn_ready.load(Ordering::SeqCst) {
            return Err(DispatchError::transaction("transactions not initialized"));
        }
        let mut log = self.lock_log();
        if log.in_txn {
            return Err(DispatchError::transaction("transaction already in progress"));
        }
        log.in_txn = true;
        Ok(())
    }

    async fn commit_transaction(&self) -> Result<(), DispatchError> {
        if self.inner.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(DispatchError::transaction("induced commit failure"));
        }
        let mut log = self.lock_log();
        if !log.in_txn {
            return Err(DispatchError::transaction("no transaction in progress"));
        }
        let pending = std::mem::take(&mut log.pending);
        for stored in pending {
            log.visible
                .entry(stored.topic.clone())
                .or_default()
                .push(stored);
        }
        log.in_txn = false;
        Ok(())
    }

    async fn abort_transaction(&self) -> Result<(), DispatchError> {
        let mut log = self.lock_log();
        if !log.in_txn {
            return Err(DispatchError::transaction("no transaction in progress"));
        }
        let discarded = log.pending.len();
        log.pending.clear();
        log.in_txn = false;
        debug!(broker = %self.inner.name, discarded, "Transaction aborted");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), DispatchError> {
        if !self.inner.connected.swap(false, Ordering::SeqCst) {
            return Err(DispatchError::state("link already disconnected"));
        }
        self.inner.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
