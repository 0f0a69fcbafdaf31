//! Handler: math.sum.sync.number
//!
//! A single number is summed digit by digit: `[12345]` (or a bare `12345`)
//! gives `15`.

use brokered_rust::{Context, HandlerError, HandlerMode};
use serde_json::{json, Value};

use super::AppState;

pub const PATTERN: &str = "math.sum.sync.number";
pub const MODE: HandlerMode = HandlerMode::RequestReply;

fn single_number(input: &Value) -> Option<u64> {
    match input {
        Value::Array(items) if items.len() == 1 => items[0].as_u64(),
        other => other.as_u64(),
    }
}

pub fn guard(ctx: &Context<AppState>) -> bool {
    single_number(ctx.raw_input()).is_some()
}

pub fn handle(ctx: &Context<AppState>) -> Result<Value, HandlerError> {
    let number = single_number(ctx.raw_input())
        .ok_or_else(|| HandlerError::Rejected("expected a single number".into()))?;
    let digits: u64 = number
        .to_string()
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(u64::from)
        .sum();
    Ok(json!(digits))
}
