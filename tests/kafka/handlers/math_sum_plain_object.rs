//! Handler: math.sum.sync.plain.object

use brokered_rust::{Context, HandlerError, HandlerMode};
use serde::Deserialize;
use serde_json::{json, Value};

use super::AppState;

pub const PATTERN: &str = "math.sum.sync.plain.object";
pub const MODE: HandlerMode = HandlerMode::RequestReply;

#[derive(Deserialize)]
pub struct Input {
    pub numbers: Vec<i64>,
}

pub fn guard(ctx: &Context<AppState>) -> bool {
    ctx.has_field("numbers")
}

pub fn handle(ctx: &Context<AppState>) -> Result<Value, HandlerError> {
    let input = ctx.input::<Input>()?;
    Ok(json!(input.numbers.iter().sum::<i64>()))
}
