//! Inbound replies: settle the pending request they belong to.

use tracing::{debug, warn};

use crate::bus::Record;
use crate::codec::{decode_lenient, Codec};
use crate::correlation::CorrelationRegistry;
use crate::error::{ErrorEnvelope, ErrorKind};

/// Settle the pending request `record` answers.
///
/// Never panics on malformed input: a reply without correlation id is
/// dropped, an unreadable error payload fails the request as `internal`.
pub(crate) fn settle_reply(
    registry: &CorrelationRegistry,
    codec: &dyn Codec,
    reply_suffix: &str,
    record: &Record,
) -> bool {
    let envelope = &record.envelope;
    let Some(correlation_id) = envelope.correlation_id() else {
        warn!(topic = %record.topic, offset = record.offset, "reply without correlation id, dropping");
        return false;
    };
    debug!(
        correlation_id,
        topic = %record.topic,
        partition = record.partition,
        offset = record.offset,
        "reply received"
    );

    if envelope.is_error() {
        let error = serde_json::from_slice::<ErrorEnvelope>(&envelope.payload).unwrap_or_else(|err| {
            warn!(correlation_id, error = %err, "malformed error reply");
            let pattern = record.topic.strip_suffix(reply_suffix).unwrap_or(&record.topic);
            ErrorEnvelope::new(ErrorKind::Internal, "malformed error reply", pattern)
        });
        registry.fail(correlation_id, error)
    } else {
        registry.resolve(correlation_id, decode_lenient(codec, &envelope.payload))
    }
}
