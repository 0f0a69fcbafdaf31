//! handlers: pattern-based message handlers and the server that runs them.
//!
//! Register handlers on a `HandlerRegistry`, then hand it to a `Server`
//! which consumes one topic per pattern and publishes replies.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use brokered_rust::bus::{BrokerClient, InMemoryBroker};
//! use brokered_rust::codec::JsonCodec;
//! use brokered_rust::handlers::{HandlerRegistry, Server};
//! use brokered_rust::{ClientConfig, ConsumerConfig};
//! use serde_json::json;
//!
//! let registry = HandlerRegistry::new(())
//!     .message("math.sum", |ctx| {
//!         let numbers = ctx.input::<Vec<i64>>()?;
//!         Ok(json!(numbers.iter().sum::<i64>()))
//!     })
//!     .unwrap();
//!
//! let client = BrokerClient::connected(InMemoryBroker::new(), ClientConfig::default()).unwrap();
//! let server = Server::start(
//!     Arc::new(registry),
//!     client,
//!     &ConsumerConfig::default(),
//!     Arc::new(JsonCodec),
//! )
//! .unwrap();
//! assert_eq!(server.patterns(), ["math.sum".to_string()]);
//! server.stop();
//! ```
//!
//! ## Handler Convention
//!
//! Each handler file follows this convention:
//!
//! ```ignore
//! // handlers/user_create.rs
//!
//! pub const PATTERN: &str = "user.create";
//! pub const MODE: HandlerMode = HandlerMode::RequestReply;
//!
//! pub fn guard(ctx: &Context<AppState>) -> bool {
//!     ctx.has_fields(&["name", "email"])
//! }
//!
//! pub fn handle(ctx: &Context<AppState>) -> Result<Value, HandlerError> {
//!     let input = ctx.input::<CreateUser>()?;
//!     Ok(json!({ "id": 1, "name": input.name }))
//! }
//! ```

mod context;
mod error;
mod headers;
mod registry;
mod server;

pub use context::Context;
pub use error::{HandlerError, RegistryError};
pub use headers::Headers;
pub use registry::{Dispatched, HandlerMode, HandlerRegistry};
pub use server::{Server, ServerStats};

/// Register handler modules with a registry using the convention pattern.
///
/// Each handler module must export:
/// - `PATTERN: &str` - the message pattern
/// - `MODE: HandlerMode` - request/reply or fire-and-forget
/// - `guard(ctx) -> bool` - input validation
/// - `handle(ctx) -> Result<Value, HandlerError>` - the handler
///
/// Expands to a `Result<HandlerRegistry<_>, RegistryError>`; a duplicate
/// pattern fails here, before anything is consumed.
///
/// # Example
/// ```ignore
/// let registry = brokered_rust::register_handlers!(
///     HandlerRegistry::new(AppState::default()),
///     handlers::user_create,
///     handlers::notify,
/// )?;
/// ```
#[macro_export]
macro_rules! register_handlers {
    ($registry:expr, $( $($seg:ident)::+ ),+ $(,)?) => {
        (|| -> ::std::result::Result<_, $crate::handlers::RegistryError> {
            ::std::result::Result::Ok(
                $registry
                $(
                    .with_handler(
                        $($seg)::+::PATTERN,
                        $($seg)::+::MODE,
                        $($seg)::+::guard,
                        $($seg)::+::handle,
                    )?
                )+
            )
        })()
    };
}
