//! Handler: math.sum.sync.string
//!
//! Input is a comma separated list, e.g. `"1,2,3,4,5"`.

use brokered_rust::{Context, HandlerError, HandlerMode};
use serde_json::Value;

use super::{sum, AppState};

pub const PATTERN: &str = "math.sum.sync.string";
pub const MODE: HandlerMode = HandlerMode::RequestReply;

pub fn guard(ctx: &Context<AppState>) -> bool {
    ctx.raw_input().is_string()
}

pub fn handle(ctx: &Context<AppState>) -> Result<Value, HandlerError> {
    let text = ctx.input::<String>()?;
    let values = text
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<i64>()
                .map(Value::from)
                .or_else(|_| part.parse::<f64>().map(Value::from))
                .map_err(|_| HandlerError::Rejected(format!("not a number: {part:?}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    sum(&values)
}
