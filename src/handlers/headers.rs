//! Transport headers of an inbound message.

use std::collections::HashMap;

use crate::bus::{CORRELATION_ID, REPLY_TOPIC};

/// Headers of the message being handled.
///
/// Producers attach tracing ids, tenant ids and similar metadata as headers:
///
/// ```json
/// {
///   "kafka_correlationId": "5f0c…",
///   "x-tenant": "acme"
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Headers {
    values: HashMap<String, String>,
}

impl Headers {
    /// Create empty headers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create headers from a map of values.
    pub fn from_map(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Create headers from an envelope's ordered pairs. Later duplicates win.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            values: pairs.iter().cloned().collect(),
        }
    }

    /// Get the correlation id (`kafka_correlationId`).
    pub fn correlation_id(&self) -> Option<&str> {
        self.get(CORRELATION_ID)
    }

    /// Get the reply topic (`kafka_replyTopic`).
    pub fn reply_topic(&self) -> Option<&str> {
        self.get(REPLY_TOPIC)
    }

    /// Get a header by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.as_str())
    }

    /// Set a header.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Check if a header exists.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Get all headers.
    pub fn values(&self) -> &HashMap<String, String> {
        &self.values
    }
}
