//! Error types for the broker client adapter.

use thiserror::Error;

/// Failure to establish or keep a broker connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// Every connection attempt failed.
    #[error("broker unreachable at [{brokers}] after {attempts} attempt(s)")]
    Unreachable { brokers: String, attempts: u32 },
    /// The connection dropped and the reconnect policy gave up.
    #[error("connection to broker lost")]
    Lost,
}

/// Error type for publish and poll operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// The client has not connected, or gave up reconnecting.
    #[error("client is not connected")]
    NotConnected,
    /// The broker cannot be reached.
    #[error("broker unavailable: {0}")]
    Unavailable(String),
    /// A retryable failure (leader election, full buffer, ...).
    #[error("transient publish failure: {0}")]
    Transient(String),
    /// The message itself was refused.
    #[error("message rejected: {0}")]
    Rejected(String),
}

impl PublishError {
    /// Whether a single immediate retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, PublishError::Transient(_))
    }

    /// Whether the failure means the connection is gone.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, PublishError::Unavailable(_))
    }
}
