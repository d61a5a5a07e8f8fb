//! # Publisher
//!
//! Publish session and transaction coordination.
//!
//! Responsibilities:
//! - One long-lived `PublishSession` per run, shared by workers or owned by
//!   one `TransactionCoordinator`
//! - Serialize records and drive the broker link through a FIFO op queue
//! - Enforce the `Uninitialized -> Ready -> Closed` lifecycle and the
//!   at-most-one-open-transaction invariant

pub mod memory;
pub mod metrics;
pub mod serializer;
pub mod session;
pub mod transaction;

#[cfg(feature = "kafka")]
pub mod kafka;

pub use contracts::{BrokerLink, DeliveryReport, DispatchError, Record, WireRecord};
pub use memory::MemoryBroker;
pub use metrics::{SessionMetrics, SessionMetricsSnapshot};
pub use session::{DeliveryHandle, PublishSession};
pub use transaction::{TransactionCoordinator, TxnOutcome};

#[cfg(feature = "kafka")]
pub use kafka::KafkaBroker;
