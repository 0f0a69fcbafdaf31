use thiserror::Error;

use crate::bus::{ConnectionError, PublishError};
use crate::codec::CodecError;
use crate::correlation::CorrelationError;
use crate::error::ErrorEnvelope;

/// Why a `send` or `emit` did not produce a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// The handler answered with an error envelope.
    #[error(transparent)]
    Handler(ErrorEnvelope),
    /// No reply arrived before the deadline.
    #[error("no reply for {pattern} within {timeout_ms} ms")]
    Timeout { pattern: String, timeout_ms: u64 },
    /// `send` was called for a pattern whose reply topic is not consumed.
    #[error("reply topic of {0} is not subscribed; add it with response_of")]
    NoReplySubscription(String),
    /// The dispatcher was closed.
    #[error("dispatcher is closed")]
    Closed,
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Correlation(#[from] CorrelationError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

impl DispatchError {
    /// The error envelope a handler replied with, if that is what happened.
    pub fn envelope(&self) -> Option<&ErrorEnvelope> {
        match self {
            DispatchError::Handler(envelope) => Some(envelope),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DispatchError::Timeout { .. })
    }
}
