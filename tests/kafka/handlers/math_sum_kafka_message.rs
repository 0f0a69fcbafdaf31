//! Handler: math.sum.sync.kafka.message
//!
//! The caller sends a full Kafka message `{ key, value: { numbers } }`; only
//! the value reaches the handler, the key travels as the message key.

use brokered_rust::{Context, HandlerError, HandlerMode};
use serde_json::Value;

use super::{sum_numbers_field, AppState};

pub const PATTERN: &str = "math.sum.sync.kafka.message";
pub const MODE: HandlerMode = HandlerMode::RequestReply;

pub fn guard(ctx: &Context<AppState>) -> bool {
    ctx.has_field("numbers") && ctx.key().is_some()
}

pub fn handle(ctx: &Context<AppState>) -> Result<Value, HandlerError> {
    sum_numbers_field(ctx.raw_input())
}
