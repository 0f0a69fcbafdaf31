//! Context passed to message handlers.
//!
//! Carries the decoded input, message key, headers, and a reference to the
//! service state. Handlers access everything they need through the context.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::HandlerError;
use super::headers::Headers;

/// The context passed to every message handler.
///
/// Generic over `S` (the service state) so handlers can reach whatever
/// stores, flags or clients the service was built with.
///
/// ## Example
///
/// ```ignore
/// pub fn handle(ctx: &Context<AppState>) -> Result<Value, HandlerError> {
///     let input = ctx.input::<CreateUser>()?;
///     ctx.state().users.lock().push(input.clone());
///     Ok(serde_json::to_value(input)?)
/// }
/// ```
pub struct Context<'a, S> {
    /// The pattern being handled.
    pattern: String,
    /// Decoded message value.
    input: Value,
    /// Message key, if the producer set one.
    key: Option<String>,
    /// Transport headers.
    headers: Headers,
    /// Reference to the service state.
    state: &'a S,
}

impl<'a, S> Context<'a, S> {
    /// Create a new context.
    pub(crate) fn new(
        pattern: String,
        input: Value,
        key: Option<String>,
        headers: Headers,
        state: &'a S,
    ) -> Self {
        Self {
            pattern,
            input,
            key,
            headers,
            state,
        }
    }

    /// Deserialize the input payload into a typed struct.
    pub fn input<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        serde_json::from_value(self.input.clone())
            .map_err(|e| HandlerError::DecodeFailed(e.to_string()))
    }

    /// Get the raw JSON input.
    pub fn raw_input(&self) -> &Value {
        &self.input
    }

    /// Get the pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Get the message key.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Get the headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get a reference to the service state.
    pub fn state(&self) -> &S {
        self.state
    }

    /// Check if the raw input contains a field.
    pub fn has_field(&self, field: &str) -> bool {
        self.input.get(field).is_some()
    }

    /// Check if the raw input contains all specified fields.
    pub fn has_fields(&self, fields: &[&str]) -> bool {
        fields.iter().all(|f| self.has_field(f))
    }
}
