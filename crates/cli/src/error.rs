//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Plan file not found
    #[error("Plan file not found: {path}")]
    ConfigNotFound { path: String },

    /// Plan validation error
    #[error("Plan validation failed: {message}")]
    ConfigValidation { message: String },

    /// Dispatch execution error
    #[error("Dispatch run failed: {message}")]
    DispatchExecution { message: String },

    /// Transaction failure
    #[error("Transaction failed: {message}")]
    Transaction { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    pub fn dispatch_execution(message: impl Into<String>) -> Self {
        Self::DispatchExecution {
            message: message.into(),
        }
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }
}
