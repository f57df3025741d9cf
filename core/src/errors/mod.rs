//! Domain-specific error types and error handling.

use thiserror::Error;

/// Core domain errors
#[derive(Error, Debug)]
pub enum DomainError {
    /// Policy or service construction rejected a setting
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A key-value store round trip failed
    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    /// Shorthand for an [`DomainError::InvalidConfig`] error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Shorthand for a [`DomainError::Store`] error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Whether this error came from the store
    pub fn is_store_error(&self) -> bool {
        matches!(self, Self::Store { .. })
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
