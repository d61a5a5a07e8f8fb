//! BrokerLink trait - broker connection collaborator interface
//!
//! Defines the abstract interface the publish session drives. The link is
//! assumed thread-safe for `deliver`; transaction calls are only issued by
//! the session's single worker task, in queue order.

use crate::{DeliveryReport, DispatchError, WireRecord};

/// Broker connection trait
///
/// All broker link implementations must implement this trait.
#[trait_variant::make(BrokerLink: Send)]
pub trait LocalBrokerLink {
    /// Link name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver one record, resolving when the broker acknowledges it
    ///
    /// # Errors
    /// Returns a delivery error (should include the topic)
    async fn deliver(&self, record: WireRecord) -> Result<DeliveryReport, DispatchError>;

    /// Fence previous incarnations and enable the transactional API
    async fn init_transactions(&self) -> Result<(), DispatchError>;

    /// Open a transaction
    async fn begin_transaction(&self) -> Result<(), DispatchError>;

    /// Atomically publish everything delivered since the matching begin
    async fn commit_transaction(&self) -> Result<(), DispatchError>;

    /// Discard everything delivered since the matching begin
    async fn abort_transaction(&self) -> Result<(), DispatchError>;

    /// Release the connection
    async fn disconnect(&self) -> Result<(), DispatchError>;
}
