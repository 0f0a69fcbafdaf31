//! Handler: business.create

use brokered_rust::{Context, HandlerError, HandlerMode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::user_create::User;
use super::AppState;

pub const PATTERN: &str = "business.create";
pub const MODE: HandlerMode = HandlerMode::RequestReply;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Business {
    pub name: String,
    pub phone: String,
    pub user: User,
}

pub fn guard(ctx: &Context<AppState>) -> bool {
    ctx.has_fields(&["name", "phone", "user"])
}

pub fn handle(ctx: &Context<AppState>) -> Result<Value, HandlerError> {
    let business = ctx.input::<Business>()?;
    Ok(serde_json::to_value(business)?)
}
