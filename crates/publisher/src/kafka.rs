//! Kafka broker link over librdkafka
//!
//! Thin adapter from `BrokerLink` to `rdkafka`'s `FutureProducer`. The
//! producer itself guarantees thread-safe sends; transaction calls arrive
//! serialized from the session worker.

use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use tracing::debug;

use contracts::{BrokerConfig, BrokerLink, DeliveryReport, DispatchError, WireRecord};

/// Broker link backed by a real Kafka cluster
pub struct KafkaBroker {
    producer: FutureProducer,
    name: String,
    op_timeout: Duration,
}

impl KafkaBroker {
    /// Create a producer from the broker configuration
    ///
    /// # Errors
    /// `Config` when librdkafka rejects the settings.
    pub fn connect(config: &BrokerConfig) -> Result<Self, DispatchError> {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", config.bootstrap_servers.join(","))
            .set("client.id", config.client_id.as_str())
            .set("acks", "all")
            .set("linger.ms", "10");

        if let Some(ref txn_id) = config.transactional_id {
            client_config
                .set("transactional.id", txn_id.as_str())
                .set("enable.idempotence", "true");
        }

        let producer: FutureProducer = client_config.create().map_err(|e| {
            DispatchError::config("broker", format!("producer creation failed: {e}"))
        })?;

        debug!(
            client_id = %config.client_id,
            servers = %config.bootstrap_servers.join(","),
            transactional = config.transactional_id.is_some(),
            "Kafka producer created"
        );

        Ok(Self {
            producer,
            name: config.client_id.clone(),
            op_timeout: Duration::from_secs(30),
        })
    }
}

impl BrokerLink for KafkaBroker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, record: WireRecord) -> Result<DeliveryReport, DispatchError> {
        let mut future_record: FutureRecord<'_, [u8], [u8]> =
            FutureRecord::to(&record.topic).payload(record.payload.as_ref());
        if let Some(ref key) = record.key {
            future_record = future_record.key(key.as_ref());
        }

        match self
            .producer
            .send(future_record, Timeout::After(self.op_timeout))
            .await
        {
            Ok((partition, offset)) => Ok(DeliveryReport {
                topic: record.topic.clone(),
                partition,
                offset,
            }),
            Err((e, _)) => Err(DispatchError::delivery(record.topic.clone(), e.to_string())),
        }
    }

    async fn init_transactions(&self) -> Result<(), DispatchError> {
        self.producer
            .init_transactions(Timeout::After(self.op_timeout))
            .map_err(|e| DispatchError::transaction(format!("init failed: {e}")))
    }

    async fn begin_transaction(&self) -> Result<(), DispatchError> {
        self.producer
            .begin_transaction()
            .map_err(|e| DispatchError::transaction(format!("begin failed: {e}")))
    }

    async fn commit_transaction(&self) -> Result<(), DispatchError> {
        self.producer
            .commit_transaction(Timeout::After(self.op_timeout))
            .map_err(|e| DispatchError::transaction(format!("commit failed: {e}")))
    }

    async fn abort_transaction(&self) -> Result<(), DispatchError> {
        self.producer
            .abort_transaction(Timeout::After(self.op_timeout))
            .map_err(|e| DispatchError::transaction(format!("abort failed: {e}")))
    }

    async fn disconnect(&self) -> Result<(), DispatchError> {
        self.producer
            .flush(Timeout::After(self.op_timeout))
            .map_err(|e| DispatchError::delivery("*", format!("final flush failed: {e}")))
    }
}
