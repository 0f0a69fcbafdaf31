//! Handler: math.sum.sync.array

use brokered_rust::{Context, HandlerError, HandlerMode};
use serde_json::Value;

use super::{sum, AppState};

pub const PATTERN: &str = "math.sum.sync.array";
pub const MODE: HandlerMode = HandlerMode::RequestReply;

pub fn guard(ctx: &Context<AppState>) -> bool {
    ctx.raw_input().is_array()
}

pub fn handle(ctx: &Context<AppState>) -> Result<Value, HandlerError> {
    match ctx.raw_input() {
        Value::Array(values) => sum(values),
        _ => Err(HandlerError::Rejected("expected an array".into())),
    }
}
