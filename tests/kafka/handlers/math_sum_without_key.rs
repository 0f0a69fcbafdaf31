//! Handler: math.sum.sync.without.key

use brokered_rust::{Context, HandlerError, HandlerMode};
use serde_json::Value;

use super::{sum_numbers_field, AppState};

pub const PATTERN: &str = "math.sum.sync.without.key";
pub const MODE: HandlerMode = HandlerMode::RequestReply;

pub fn guard(ctx: &Context<AppState>) -> bool {
    ctx.has_field("numbers")
}

pub fn handle(ctx: &Context<AppState>) -> Result<Value, HandlerError> {
    sum_numbers_field(ctx.raw_input())
}
