//! Layered error definitions
//!
//! Categorized by source: config / source / session lifecycle / transaction / delivery

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum DispatchError {
    // ===== Configuration Errors =====
    /// Bad or missing connection settings, fatal at startup
    #[error("config error at '{field}': {message}")]
    Config { field: String, message: String },

    // ===== Source Errors =====
    /// Record source read failure, contained to the owning worker
    #[error("source read error at '{path}': {message}")]
    SourceRead { path: String, message: String },

    // ===== Session Lifecycle Errors =====
    /// Send attempted on a closed session, indicates a lifecycle-ordering bug
    #[error("send on closed session for topic '{topic}'")]
    SendOnClosedSession { topic: String },

    /// Invalid lifecycle or transaction-state transition
    #[error("invalid session state: {message}")]
    State { message: String },

    // ===== Transaction Errors =====
    /// Commit-time failure, the transaction has already been aborted
    #[error("transaction failed: {message}")]
    Transaction { message: String },

    // ===== Delivery Errors =====
    /// Per-record delivery failure, reported asynchronously, never stops siblings
    #[error("delivery error for topic '{topic}': {message}")]
    Delivery { topic: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatchError {
    /// Create configuration error
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create source read error
    pub fn source_read(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceRead {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create send-on-closed-session error
    pub fn send_on_closed(topic: impl Into<String>) -> Self {
        Self::SendOnClosedSession {
            topic: topic.into(),
        }
    }

    /// Create state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create transaction error
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }

    /// Create delivery error
    pub fn delivery(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delivery {
            topic: topic.into(),
            message: message.into(),
        }
    }
}
