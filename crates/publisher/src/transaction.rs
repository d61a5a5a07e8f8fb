//! TransactionCoordinator - atomic multi-topic batches over one session
//!
//! State machine: `Idle -> Open -> {Committed, Aborted} -> Idle`. The
//! coordinator owns the session exclusively for the transactional part of
//! its lifetime; a session is never both coordinator-owned and shared.
//!
//! Every error path resolves through abort before it surfaces, so no caller
//! ever observes an open transaction after a failure.

use tracing::{info, warn};

use contracts::{BrokerLink, DispatchError, Record};

use crate::session::{DeliveryHandle, PublishSession};

/// Outcome of a commit attempt
///
/// `Aborted` means the commit failed and the coordinator already rolled the
/// transaction back; none of its records became visible.
#[must_use]
#[derive(Debug)]
pub enum TxnOutcome {
    Committed,
    Aborted(DispatchError),
}

impl TxnOutcome {
    /// Whether the transaction committed
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }
}

/// Drives begin/send/commit/abort over an exclusively owned session
pub struct TransactionCoordinator<B: BrokerLink + Send + Sync + 'static> {
    session: PublishSession<B>,
}

impl<B: BrokerLink + Send + Sync + 'static> TransactionCoordinator<B> {
    /// Take ownership of a transactional session and initialize transactions
    ///
    /// # Errors
    /// `State` when the session is not transactional; broker errors from
    /// the fencing call.
    pub async fn init(session: PublishSession<B>) -> Result<Self, DispatchError> {
        session.init_transactions().await?;
        Ok(Self { session })
    }

    /// The underlying session (metrics, name)
    pub fn session(&self) -> &PublishSession<B> {
        &self.session
    }

    /// Whether a transaction is currently open
    pub fn is_open(&self) -> bool {
        self.session.transaction_open()
    }

    /// Open a transaction
    ///
    /// # Errors
    /// `State` on nested begin.
    pub async fn begin(&mut self) -> Result<(), DispatchError> {
        self.session.begin_transaction().await
    }

    /// Buffer one record into the open transaction
    ///
    /// Any send-time failure aborts the transaction before the error is
    /// returned; the session is never left open across an error boundary.
    pub async fn send(&mut self, record: Record) -> Result<DeliveryHandle, DispatchError> {
        match self.session.send(record).await {
            Ok(handle) => Ok(handle),
            Err(err) => {
                self.abort_on_error().await;
                Err(err)
            }
        }
    }

    /// Buffer a batch of records, with the same abort-on-error containment
    pub async fn publish_all(
        &mut self,
        records: Vec<Record>,
    ) -> Result<Vec<DeliveryHandle>, DispatchError> {
        let mut handles = Vec::with_capacity(records.len());
        for record in records {
            handles.push(self.send(record).await?);
        }
        Ok(handles)
    }

    /// Attempt atomic visibility of everything sent since `begin`
    ///
    /// On commit failure the coordinator aborts and returns
    /// `TxnOutcome::Aborted` with the cause; the session is back at `Idle`
    /// either way.
    ///
    /// # Errors
    /// `State` when no transaction is open.
    pub async fn commit(&mut self) -> Result<TxnOutcome, DispatchError> {
        if !self.session.transaction_open() {
            return Err(DispatchError::state("no open transaction to commit"));
        }

        match self.session.commit_transaction().await {
            Ok(()) => {
                info!(session = %self.session.name(), "Transaction committed");
                Ok(TxnOutcome::Committed)
            }
            Err(cause) => {
                self.abort_on_error().await;
                Ok(TxnOutcome::Aborted(DispatchError::transaction(format!(
                    "commit failed: {cause}"
                ))))
            }
        }
    }

    /// Discard everything sent since `begin`; none of it becomes visible
    ///
    /// # Errors
    /// `State` when no transaction is open.
    pub async fn abort(&mut self) -> Result<(), DispatchError> {
        let result = self.session.abort_transaction().await;
        if result.is_ok() {
            info!(session = %self.session.name(), "Transaction aborted");
        }
        result
    }

    /// Release the session so its owner can flush and close it
    pub fn into_session(self) -> PublishSession<B> {
        self.session
    }

    async fn abort_on_error(&mut self) {
        if !self.session.transaction_open() {
            return;
        }
        if let Err(abort_err) = self.session.abort_transaction().await {
            warn!(
                session = %self.session.name(),
                error = %abort_err,
                "Abort after failure also failed"
            );
        }
    }
}
