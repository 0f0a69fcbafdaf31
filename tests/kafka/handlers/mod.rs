//! Handler fixtures following the convention:
//! - `PATTERN` - the message pattern
//! - `MODE` - request/reply or fire-and-forget
//! - `guard` - input validation
//! - `handle` - the handler

use std::sync::Arc;

use brokered_rust::{HandlerError, Signal};
use parking_lot::Mutex;
use serde_json::{json, Value};

/// Service state shared by the fixtures.
#[derive(Clone, Default)]
pub struct AppState {
    /// Raised by `notify`.
    pub notified: Signal,
    /// Names of created users, in handling order.
    pub users: Arc<Mutex<Vec<String>>>,
}

pub mod business_create;
pub mod math_sum_array;
pub mod math_sum_kafka_message;
pub mod math_sum_number;
pub mod math_sum_plain_object;
pub mod math_sum_string;
pub mod math_sum_without_key;
pub mod notify;
pub mod user_create;

/// Sum numeric values. Integers stay integers; any float makes the sum a float.
pub fn sum(values: &[Value]) -> Result<Value, HandlerError> {
    if values.is_empty() {
        return Err(HandlerError::Rejected("nothing to sum".into()));
    }
    if values.iter().all(Value::is_i64) {
        return Ok(json!(values.iter().filter_map(Value::as_i64).sum::<i64>()));
    }
    let mut total = 0.0;
    for value in values {
        total += value
            .as_f64()
            .ok_or_else(|| HandlerError::Rejected(format!("not a number: {value}")))?;
    }
    Ok(json!(total))
}

/// Sum the `numbers` field of an object input.
pub fn sum_numbers_field(input: &Value) -> Result<Value, HandlerError> {
    match input.get("numbers") {
        Some(Value::Array(numbers)) => sum(numbers),
        _ => Err(HandlerError::Rejected("numbers must be an array".into())),
    }
}
