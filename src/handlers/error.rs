//! Error types for message handlers and their registration.

use std::error::Error;

use thiserror::Error;

use crate::codec::CodecError;

/// Error type for handler operations.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// No handler registered for this pattern.
    #[error("no matching message handler for pattern: {0}")]
    UnknownPattern(String),
    /// Payload decode / deserialization failed.
    #[error("decode failed: {0}")]
    DecodeFailed(String),
    /// Business logic rejected the message (validation, invariant violation).
    #[error("rejected: {0}")]
    Rejected(String),
    /// Entity or resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Guard rejected the message (input validation failed).
    #[error("guard rejected message: {0}")]
    GuardRejected(String),
    /// Other error.
    #[error("handler error: {0}")]
    Other(Box<dyn Error + Send + Sync>),
}

impl HandlerError {
    /// Wrap any error as an internal failure.
    pub fn other(err: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        HandlerError::Other(err.into())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::DecodeFailed(err.to_string())
    }
}

impl From<CodecError> for HandlerError {
    fn from(err: CodecError) -> Self {
        HandlerError::DecodeFailed(err.to_string())
    }
}

/// Startup-time misconfiguration of the handler registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("pattern already registered: {0}")]
    DuplicatePattern(String),
    #[error("invalid pattern {0:?}: use letters, digits, '.', '_' or '-'")]
    InvalidPattern(String),
}
