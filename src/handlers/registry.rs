//! Handler registry - pattern to handler mapping and dispatch.
//!
//! `HandlerRegistry<S>` holds the service state and a set of handlers keyed
//! by pattern. Each handler receives a `Context<S>` and returns
//! `Result<Value, HandlerError>`.
//!
//! ## Example
//!
//! ```
//! use brokered_rust::handlers::{Dispatched, HandlerRegistry, Headers};
//! use serde_json::json;
//!
//! let registry = HandlerRegistry::new(())
//!     .message("math.sum", |ctx| {
//!         let numbers = ctx.input::<Vec<i64>>()?;
//!         Ok(json!(numbers.iter().sum::<i64>()))
//!     })
//!     .unwrap();
//!
//! let result = registry.dispatch("math.sum", json!([1, 2, 3]), None, Headers::new(), true);
//! assert_eq!(result, Dispatched::Reply(json!(6)));
//! ```

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde_json::Value;
use tracing::{debug, warn};

use super::context::Context;
use super::error::{HandlerError, RegistryError};
use super::headers::Headers;
use crate::bus::Envelope;
use crate::codec::{decode_lenient, Codec};
use crate::error::{translate, translate_panic, ErrorEnvelope};

/// Longest topic name brokers accept.
const MAX_PATTERN_LEN: usize = 249;

/// How a handler's outcome travels back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerMode {
    /// The caller waits for a reply (`send`).
    RequestReply,
    /// Nobody waits (`emit`); failures are logged only.
    FireAndForget,
}

type GuardFn<S> = Box<dyn Fn(&Context<S>) -> bool + Send + Sync>;
type HandleFn<S> = Box<dyn Fn(&Context<S>) -> Result<Value, HandlerError> + Send + Sync>;

/// A registered handler with optional guard.
struct HandlerEntry<S> {
    mode: HandlerMode,
    guard: Option<GuardFn<S>>,
    handle: HandleFn<S>,
}

/// Outcome of dispatching one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    /// A request/reply handler produced a value.
    Reply(Value),
    /// A request/reply handler failed, or no handler can answer.
    Failed(ErrorEnvelope),
    /// An event handler ran to completion.
    Done,
    /// An event handler failed, or the event had no handler. Already logged.
    Suppressed,
}

/// Routes messages to handler functions by pattern.
///
/// Generic over `S`, the service state. Handlers receive a `Context<S>` and
/// can access the state via `ctx.state()`. Registration happens once at
/// startup; afterwards the registry is only read and can be shared through
/// an `Arc` without locking.
pub struct HandlerRegistry<S> {
    state: S,
    handlers: HashMap<String, HandlerEntry<S>>,
}

impl<S: Send + Sync + 'static> HandlerRegistry<S> {
    /// Create an empty registry around the given state.
    pub fn new(state: S) -> Self {
        Self {
            state,
            handlers: HashMap::new(),
        }
    }

    /// Bind `pattern` to a handler.
    ///
    /// Fails if the pattern is already bound or is not a valid topic name.
    pub fn register<F>(
        &mut self,
        pattern: &str,
        mode: HandlerMode,
        handler: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&Context<S>) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        self.insert(pattern, mode, None, Box::new(handler))
    }

    /// Bind `pattern` to a handler with a guard function.
    ///
    /// The guard is called before the handler. If it returns `false`, the
    /// message is rejected with `HandlerError::GuardRejected`.
    pub fn register_guarded<G, F>(
        &mut self,
        pattern: &str,
        mode: HandlerMode,
        guard: G,
        handler: F,
    ) -> Result<(), RegistryError>
    where
        G: Fn(&Context<S>) -> bool + Send + Sync + 'static,
        F: Fn(&Context<S>) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        self.insert(pattern, mode, Some(Box::new(guard)), Box::new(handler))
    }

    /// Register a request/reply handler. Builder style.
    pub fn message<F>(mut self, pattern: &str, handler: F) -> Result<Self, RegistryError>
    where
        F: Fn(&Context<S>) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        self.register(pattern, HandlerMode::RequestReply, handler)?;
        Ok(self)
    }

    /// Register a request/reply handler with a guard. Builder style.
    pub fn message_guarded<G, F>(
        mut self,
        pattern: &str,
        guard: G,
        handler: F,
    ) -> Result<Self, RegistryError>
    where
        G: Fn(&Context<S>) -> bool + Send + Sync + 'static,
        F: Fn(&Context<S>) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        self.register_guarded(pattern, HandlerMode::RequestReply, guard, handler)?;
        Ok(self)
    }

    /// Register a fire-and-forget handler. Builder style.
    ///
    /// The handler's value is discarded.
    pub fn event<F>(mut self, pattern: &str, handler: F) -> Result<Self, RegistryError>
    where
        F: Fn(&Context<S>) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        self.register(pattern, HandlerMode::FireAndForget, handler)?;
        Ok(self)
    }

    /// Register a guarded handler with an explicit mode. Builder style.
    ///
    /// This is what `register_handlers!` expands to.
    pub fn with_handler<G, F>(
        mut self,
        pattern: &str,
        mode: HandlerMode,
        guard: G,
        handler: F,
    ) -> Result<Self, RegistryError>
    where
        G: Fn(&Context<S>) -> bool + Send + Sync + 'static,
        F: Fn(&Context<S>) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        self.register_guarded(pattern, mode, guard, handler)?;
        Ok(self)
    }

    fn insert(
        &mut self,
        pattern: &str,
        mode: HandlerMode,
        guard: Option<GuardFn<S>>,
        handle: HandleFn<S>,
    ) -> Result<(), RegistryError> {
        validate_pattern(pattern)?;
        if self.handlers.contains_key(pattern) {
            return Err(RegistryError::DuplicatePattern(pattern.to_string()));
        }
        debug!(pattern, ?mode, "handler registered");
        self.handlers
            .insert(pattern.to_string(), HandlerEntry { mode, guard, handle });
        Ok(())
    }

    /// Dispatch a message by pattern.
    ///
    /// Builds a `Context`, runs the guard (if any), then the handler. Panics
    /// are caught here. `expects_reply` says whether the sender waits: a
    /// waiting sender always gets an outcome, even when the pattern is unknown
    /// or only has an event handler.
    pub fn dispatch(
        &self,
        pattern: &str,
        input: Value,
        key: Option<String>,
        headers: Headers,
        expects_reply: bool,
    ) -> Dispatched {
        let entry = match self.handlers.get(pattern) {
            Some(entry) if entry.mode == HandlerMode::RequestReply || !expects_reply => entry,
            _ if expects_reply => {
                let err = HandlerError::UnknownPattern(pattern.to_string());
                return match translate(&err, HandlerMode::RequestReply, pattern) {
                    Some(envelope) => Dispatched::Failed(envelope),
                    None => Dispatched::Suppressed,
                };
            }
            _ => {
                warn!(pattern, "no event handler registered, dropping message");
                return Dispatched::Suppressed;
            }
        };

        let ctx = Context::new(pattern.to_string(), input, key, headers, &self.state);

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            if let Some(guard) = &entry.guard {
                if !guard(&ctx) {
                    return Err(HandlerError::GuardRejected(pattern.to_string()));
                }
            }
            (entry.handle)(&ctx)
        }));

        match (outcome, entry.mode) {
            (Ok(Ok(value)), HandlerMode::RequestReply) => Dispatched::Reply(value),
            (Ok(Ok(_)), HandlerMode::FireAndForget) => Dispatched::Done,
            (Ok(Err(err)), mode) => match translate(&err, mode, pattern) {
                Some(envelope) => Dispatched::Failed(envelope),
                None => Dispatched::Suppressed,
            },
            (Err(panic), mode) => match translate_panic(panic.as_ref(), mode, pattern) {
                Some(envelope) => Dispatched::Failed(envelope),
                None => Dispatched::Suppressed,
            },
        }
    }

    /// Dispatch a broker envelope.
    ///
    /// Maps the envelope fields to a dispatch call:
    /// - `envelope.topic` → pattern
    /// - `envelope.payload` → input (decoded leniently with `codec`)
    /// - `envelope.key` → message key
    /// - `envelope.headers` → headers
    pub fn dispatch_envelope(&self, envelope: &Envelope, codec: &dyn Codec) -> Dispatched {
        let input = decode_lenient(codec, &envelope.payload);
        self.dispatch(
            &envelope.topic,
            input,
            envelope.key.clone(),
            Headers::from_pairs(&envelope.headers),
            envelope.expects_reply(),
        )
    }

    /// Registered patterns, sorted.
    pub fn patterns(&self) -> Vec<&str> {
        let mut patterns: Vec<&str> = self.handlers.keys().map(|s| s.as_str()).collect();
        patterns.sort_unstable();
        patterns
    }

    /// Mode of the handler bound to `pattern`.
    pub fn mode(&self, pattern: &str) -> Option<HandlerMode> {
        self.handlers.get(pattern).map(|h| h.mode)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Get a reference to the service state.
    pub fn state(&self) -> &S {
        &self.state
    }
}

fn validate_pattern(pattern: &str) -> Result<(), RegistryError> {
    let legal = !pattern.is_empty()
        && pattern.len() <= MAX_PATTERN_LEN
        && pattern
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if legal {
        Ok(())
    } else {
        Err(RegistryError::InvalidPattern(pattern.to_string()))
    }
}
