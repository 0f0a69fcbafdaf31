//! Transport envelope carried by the broker.

use uuid::Uuid;

/// Header carrying the correlation id of a request and its reply.
pub const CORRELATION_ID: &str = "kafka_correlationId";
/// Header naming the topic the reply must be published to.
pub const REPLY_TOPIC: &str = "kafka_replyTopic";
/// Header naming the partition of the reply topic the caller consumes.
pub const REPLY_PARTITION: &str = "kafka_replyPartition";
/// Header set on replies whose payload is an error envelope.
pub const ERROR: &str = "kafka_error";
/// Header marking the final reply of a request.
pub const IS_DISPOSED: &str = "kafka_isDisposed";

/// A message on the broker.
///
/// `topic` doubles as the message pattern: requests for `math.sum` are
/// published on the `math.sum` topic and answered on `math.sum.reply`.
///
/// A correlation id is present iff a reply is expected, in which case the
/// reply topic header is present as well. The `request`, `event` and `reply`
/// constructors keep that invariant; `validate` checks it for envelopes built
/// by hand.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    /// Unique identifier for this message
    pub id: String,
    /// Destination topic (the message pattern)
    pub topic: String,
    /// Optional partitioning key
    pub key: Option<String>,
    /// Serialized payload (JSON for the bundled codec)
    pub payload: Vec<u8>,
    /// Ordered transport headers
    pub headers: Vec<(String, String)>,
    /// Explicit destination partition, bypassing key hashing
    pub partition: Option<u32>,
}

impl Envelope {
    /// Create a bare envelope with a fresh id.
    pub fn new(topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.into(),
            key: None,
            payload,
            headers: Vec::new(),
            partition: None,
        }
    }

    /// A request that expects a reply on `reply_topic`.
    pub fn request(
        pattern: impl Into<String>,
        payload: Vec<u8>,
        correlation_id: impl Into<String>,
        reply_topic: impl Into<String>,
    ) -> Self {
        Self::new(pattern, payload)
            .with_header(CORRELATION_ID, correlation_id)
            .with_header(REPLY_TOPIC, reply_topic)
    }

    /// A fire-and-forget event. Carries no correlation id.
    pub fn event(pattern: impl Into<String>, payload: Vec<u8>) -> Self {
        Self::new(pattern, payload)
    }

    /// The reply to `request`, addressed to its reply topic and partition.
    ///
    /// Returns `None` when the request did not expect a reply.
    pub fn reply(request: &Envelope, payload: Vec<u8>) -> Option<Self> {
        let correlation_id = request.correlation_id()?;
        let reply_topic = request.reply_topic()?;
        let mut reply = Self::new(reply_topic, payload)
            .with_header(CORRELATION_ID, correlation_id)
            .with_header(IS_DISPOSED, "1");
        reply.partition = request
            .header(REPLY_PARTITION)
            .and_then(|p| p.parse::<u32>().ok());
        Some(reply)
    }

    /// Set the partitioning key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Append a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Pin the envelope to a partition.
    pub fn with_partition(mut self, partition: u32) -> Self {
        self.partition = Some(partition);
        self
    }

    /// Mark this envelope as carrying an error envelope payload.
    pub fn as_error(self) -> Self {
        self.with_header(ERROR, "1")
    }

    /// First value of a header.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.header(CORRELATION_ID)
    }

    pub fn reply_topic(&self) -> Option<&str> {
        self.header(REPLY_TOPIC)
    }

    /// Whether the sender waits for a reply.
    pub fn expects_reply(&self) -> bool {
        self.correlation_id().is_some() && self.reply_topic().is_some()
    }

    /// Whether the payload is an error envelope.
    pub fn is_error(&self) -> bool {
        self.header(ERROR).is_some()
    }

    /// Get the payload as a string (if valid UTF-8).
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    /// Check the envelope invariants.
    ///
    /// Replies carry a correlation id without a reply topic, so a lone
    /// correlation id is accepted; a reply topic without a correlation id is
    /// not.
    pub fn validate(&self) -> Result<(), String> {
        if self.topic.is_empty() {
            return Err("envelope has an empty topic".into());
        }
        if self.reply_topic().is_some() && self.correlation_id().is_none() {
            return Err(format!(
                "envelope on {} names a reply topic but carries no correlation id",
                self.topic
            ));
        }
        if matches!(self.correlation_id(), Some("")) {
            return Err(format!("envelope on {} has an empty correlation id", self.topic));
        }
        Ok(())
    }
}
