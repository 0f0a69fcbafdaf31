//! Core subscriber trait for the broker.

use super::envelope::Envelope;
use super::error::PublishError;

/// An envelope as consumed from a topic partition.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub topic: String,
    pub partition: u32,
    pub offset: u64,
    pub envelope: Envelope,
}

/// Trait for consuming envelopes from a broker.
///
/// Pull-based, like a Kafka consumer: `poll` blocks until a record is
/// available on one of `topics` for the consumer `group` or the timeout
/// expires. Within a group each record is delivered to one consumer; every
/// group sees every record. Order is preserved per partition only: a
/// partition's next record goes out once the previous one is acked.
pub trait Subscriber: Send + Sync {
    /// Poll for the next record, blocking until one is available or timeout.
    fn poll(
        &self,
        topics: &[String],
        group: &str,
        timeout_ms: u64,
    ) -> Result<Option<Record>, PublishError>;

    /// Acknowledge that a record has been processed, releasing its partition.
    fn ack(&self, group: &str, record: &Record) -> Result<(), PublishError>;
}
