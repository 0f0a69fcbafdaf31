//! Configuration for the broker client, consumers and dispatcher.
//!
//! Every struct deserializes with defaults for missing fields, so a partial
//! JSON document is enough:
//!
//! ```
//! use brokered_rust::KafkaOptions;
//!
//! let options = KafkaOptions::from_json(r#"{ "consumer": { "group_id": "billing" } }"#).unwrap();
//! assert_eq!(options.consumer.group_id, "billing");
//! assert_eq!(options.dispatcher.reply_suffix, ".reply");
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bus::RetryPolicy;

/// Error loading configuration.
#[derive(Debug, Error)]
#[error("invalid configuration: {0}")]
pub struct ConfigError(#[from] serde_json::Error);

/// Top-level options for a service talking to the broker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KafkaOptions {
    pub client: ClientConfig,
    pub consumer: ConsumerConfig,
    pub dispatcher: DispatcherConfig,
}

impl KafkaOptions {
    /// Parse options from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Identifier sent to the broker on connect.
    pub client_id: String,
    /// Backoff used for the initial connect and for reconnects.
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: "brokered-client".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Consumer settings.
///
/// The server consumes in group `<group_id>-server`. Each dispatcher consumes
/// replies in its own group, `<group_id>-client-<instance>`, so dispatchers
/// sharing a `group_id` never take each other's replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    pub group_id: String,
    /// Upper bound on how long a consumer blocks in one poll.
    pub poll_interval_ms: u64,
    /// Competing consumer threads started by the server.
    pub consumers: usize,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            group_id: "brokered-group".to_string(),
            poll_interval_ms: 50,
            consumers: 1,
        }
    }
}

impl ConsumerConfig {
    pub fn server_group(&self) -> String {
        format!("{}-server", self.group_id)
    }

    /// Reply group of one dispatcher instance.
    pub fn reply_group(&self, instance: &str) -> String {
        format!("{}-client-{}", self.group_id, instance)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Request/reply settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Default deadline of a `send`.
    pub request_timeout_ms: u64,
    /// Appended to a pattern to name its reply topic.
    pub reply_suffix: String,
    /// How often abandoned pending requests are swept.
    pub sweep_interval_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5_000,
            reply_suffix: ".reply".to_string(),
            sweep_interval_ms: 100,
        }
    }
}

impl DispatcherConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Reply topic for `pattern`.
    pub fn reply_topic(&self, pattern: &str) -> String {
        format!("{}{}", pattern, self.reply_suffix)
    }
}
