//! Core publisher trait for the broker.

use super::envelope::Envelope;
use super::error::PublishError;

/// Where a published envelope landed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordMetadata {
    pub topic: String,
    pub partition: u32,
    pub offset: u64,
}

/// Trait for publishing envelopes to a broker.
///
/// Implementations might include:
/// - `InMemoryBroker` - For testing and single-process scenarios
/// - a Kafka producer
/// - a Redpanda or other Kafka-compatible producer
pub trait Publisher: Send + Sync {
    /// Publish a single envelope.
    fn publish(&self, envelope: Envelope) -> Result<RecordMetadata, PublishError>;

    /// Publish multiple envelopes.
    ///
    /// Default implementation publishes envelopes sequentially and stops at
    /// the first failure. Implementations may override for batch optimization.
    fn publish_batch(&self, envelopes: Vec<Envelope>) -> Result<Vec<RecordMetadata>, PublishError> {
        envelopes.into_iter().map(|e| self.publish(e)).collect()
    }
}
