//! Error types for model construction and validation

use thiserror::Error;

/// Errors raised when a model value is malformed
#[derive(Debug, Error)]
pub enum Error {
    /// Principal violates a well-formedness rule
    #[error("invalid principal: {message}")]
    InvalidPrincipal {
        /// What is wrong with the principal
        message: String,
    },

    /// Trust policy cannot be used for evaluation
    #[error("malformed trust policy for {role}: {message}")]
    MalformedPolicy {
        /// Role the policy belongs to
        role: String,
        /// What is wrong with the policy
        message: String,
    },

    /// Resource descriptor is unusable
    #[error("invalid resource {name}: {message}")]
    InvalidResource {
        /// Resource name
        name: String,
        /// What is wrong with the descriptor
        message: String,
    },
}

impl Error {
    /// Create an invalid principal error
    pub fn invalid_principal(msg: impl Into<String>) -> Self {
        Self::InvalidPrincipal {
            message: msg.into(),
        }
    }

    /// Create a malformed policy error
    pub fn malformed_policy(role: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::MalformedPolicy {
            role: role.into(),
            message: msg.into(),
        }
    }

    /// Create an invalid resource error
    pub fn invalid_resource(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidResource {
            name: name.into(),
            message: msg.into(),
        }
    }
}

/// Result type for model operations
pub type Result<T> = std::result::Result<T, Error>;
