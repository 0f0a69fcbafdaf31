use std::any::Any;

use tracing::{debug, error, warn};

use super::{ErrorEnvelope, ErrorKind};
use crate::handlers::{HandlerError, HandlerMode};

/// Message sent in place of internal failure details.
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Convert a handler failure into what goes back over the reply channel.
///
/// Request/reply failures always produce an envelope. Business errors keep
/// their message; anything else is reported as `internal` with a generic
/// message and logged here. Fire-and-forget failures are logged and
/// swallowed.
pub fn translate(err: &HandlerError, mode: HandlerMode, pattern: &str) -> Option<ErrorEnvelope> {
    if mode == HandlerMode::FireAndForget {
        warn!(pattern, error = %err, "event handler failed, suppressing");
        return None;
    }

    let (kind, message) = match err {
        HandlerError::UnknownPattern(_) | HandlerError::NotFound(_) => {
            (ErrorKind::NotFound, err.to_string())
        }
        HandlerError::DecodeFailed(_)
        | HandlerError::Rejected(_)
        | HandlerError::GuardRejected(_) => (ErrorKind::Validation, err.to_string()),
        HandlerError::Other(_) => {
            error!(pattern, error = %err, "message handler failed");
            (ErrorKind::Internal, INTERNAL_MESSAGE.to_string())
        }
    };

    debug!(pattern, kind = %kind, "handler error translated");
    Some(ErrorEnvelope::new(kind, message, pattern))
}

/// Convert a handler panic. Never leaks the panic message to the caller.
pub fn translate_panic(
    payload: &(dyn Any + Send),
    mode: HandlerMode,
    pattern: &str,
) -> Option<ErrorEnvelope> {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());

    error!(pattern, panic = %detail, ?mode, "handler panicked");

    match mode {
        HandlerMode::FireAndForget => None,
        HandlerMode::RequestReply => Some(ErrorEnvelope::new(
            ErrorKind::Internal,
            INTERNAL_MESSAGE,
            pattern,
        )),
    }
}
