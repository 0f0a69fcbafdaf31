//! Handler: notify (event)

use brokered_rust::{Context, HandlerError, HandlerMode};
use serde_json::Value;

use super::AppState;

pub const PATTERN: &str = "notify";
pub const MODE: HandlerMode = HandlerMode::FireAndForget;

pub fn guard(_ctx: &Context<AppState>) -> bool {
    true
}

pub fn handle(ctx: &Context<AppState>) -> Result<Value, HandlerError> {
    ctx.state().notified.set();
    Ok(Value::Null)
}
