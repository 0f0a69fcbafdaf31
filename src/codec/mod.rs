//! Payload serialization.
//!
//! The dispatcher and the server agree on a `Codec` to turn JSON values into
//! envelope payloads and back. `JsonCodec` is the default and matches what
//! other Kafka microservice stacks put on the wire.

mod message;

pub use message::OutgoingMessage;

use serde_json::Value;
use thiserror::Error;

/// Error type for payload encoding and decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("decode failed: {0}")]
    Decode(String),
}

/// Converts payload values to bytes and back.
pub trait Codec: Send + Sync {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError>;

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError>;
}

/// JSON payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// Decode an inbound payload, tolerating producers that do not use the codec.
///
/// Tries the codec first, then falls back to the raw UTF-8 string, then null.
/// An empty payload decodes to null.
pub fn decode_lenient(codec: &dyn Codec, bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    if let Ok(value) = codec.decode(bytes) {
        return value;
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => Value::String(s.to_string()),
        Err(_) => Value::Null,
    }
}
