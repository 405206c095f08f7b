//! Error types for harness runs

use std::time::Duration;

use thiserror::Error;

/// Errors that abort a run or its reporting
#[derive(Debug, Error)]
pub enum Error {
    /// Inputs or collaborators are unusable
    #[error("precondition failed: {message}")]
    Precondition {
        /// What is missing or malformed
        message: String,
    },

    /// External query exceeded its deadline
    #[error("{what} timed out after {}s", timeout.as_secs_f64())]
    Timeout {
        /// What was being queried
        what: String,
        /// Deadline that was exceeded
        timeout: Duration,
    },

    /// External collaborator returned an error
    #[error("{source_name} error: {message}")]
    Source {
        /// Collaborator name (e.g. "kubernetes", "inventory")
        source_name: String,
        /// Error message
        message: String,
    },

    /// Malformed model value
    #[error(transparent)]
    Model(#[from] irsa_model::Error),

    /// Report could not be serialized
    #[error("report serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Report could not be written
    #[error("report output error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a precondition error
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition {
            message: msg.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(what: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            timeout,
        }
    }

    /// Create a collaborator error
    pub fn collaborator(source_name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Source {
            source_name: source_name.into(),
            message: msg.into(),
        }
    }

    /// Whether this error came from a deadline rather than a failure
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, Error>;
