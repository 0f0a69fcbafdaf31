//! Kafka message normalization for outgoing payloads.

use serde_json::{Map, Value};

const MESSAGE_FIELDS: [&str; 4] = ["key", "value", "headers", "partition"];

/// A caller payload split into the parts that travel separately on the wire.
///
/// Callers may hand over a complete Kafka message, `{ "key": .., "value": ..,
/// "headers": {..} }`, or just the value. An object is taken as a message
/// only when it has a `value` field and no fields other than `key`, `value`,
/// `headers` and `partition`; anything else is the value itself.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub key: Option<String>,
    pub value: Value,
    pub headers: Vec<(String, String)>,
    pub partition: Option<u32>,
}

impl OutgoingMessage {
    /// Wrap a bare value.
    pub fn value(value: Value) -> Self {
        Self {
            key: None,
            value,
            headers: Vec::new(),
            partition: None,
        }
    }

    /// Normalize a caller payload.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) if is_message(&map) => Self::from_message(map),
            other => Self::value(other),
        }
    }

    fn from_message(mut map: Map<String, Value>) -> Self {
        let key = match map.remove("key") {
            Some(Value::String(s)) => Some(s),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        let headers = match map.remove("headers") {
            Some(Value::Object(headers)) => headers
                .into_iter()
                .map(|(k, v)| match v {
                    Value::String(s) => (k, s),
                    other => (k, other.to_string()),
                })
                .collect(),
            _ => Vec::new(),
        };
        let partition = map
            .remove("partition")
            .and_then(|p| p.as_u64())
            .and_then(|p| u32::try_from(p).ok());

        Self {
            key,
            value: map.remove("value").unwrap_or(Value::Null),
            headers,
            partition,
        }
    }
}

fn is_message(map: &Map<String, Value>) -> bool {
    map.contains_key("value") && map.keys().all(|k| MESSAGE_FIELDS.contains(&k.as_str()))
}
