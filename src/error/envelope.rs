use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable error categories shared by both ends of the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Validation,
    Internal,
    NotFound,
    Timeout,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Internal => "internal",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Timeout => "timeout",
        }
    }

    /// Map this kind to an HTTP-style status code for entry points that
    /// answer over HTTP.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Timeout => 504,
            ErrorKind::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure as it travels back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind} error on {pattern}: {message}")]
pub struct ErrorEnvelope {
    pub kind: ErrorKind,
    pub message: String,
    /// The pattern of the request that failed.
    pub pattern: String,
}

impl ErrorEnvelope {
    pub fn new(kind: ErrorKind, message: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            pattern: pattern.into(),
        }
    }

    /// The envelope a pending request fails with when its deadline passes.
    pub fn timeout(pattern: impl Into<String>, after: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("no reply within {} ms", after.as_millis()),
            pattern,
        )
    }
}
