//! Handler: user.create

use brokered_rust::{Context, HandlerError, HandlerMode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::AppState;

pub const PATTERN: &str = "user.create";
pub const MODE: HandlerMode = HandlerMode::RequestReply;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub name: String,
    pub phone: String,
    pub years: u32,
}

pub fn guard(ctx: &Context<AppState>) -> bool {
    ctx.has_fields(&["email", "name", "phone", "years"])
}

pub fn handle(ctx: &Context<AppState>) -> Result<Value, HandlerError> {
    let user = ctx.input::<User>()?;
    if user.years == 0 {
        return Err(HandlerError::Rejected("years must be positive".into()));
    }
    ctx.state().users.lock().push(user.name.clone());
    Ok(serde_json::to_value(user)?)
}
