//! brokered_rust: request/reply and fire-and-forget messaging over a
//! topic/partition broker.
//!
//! - `bus`: envelopes, the `Broker` seam, `InMemoryBroker`, `BrokerClient`
//! - `handlers`: pattern handlers and the `Server` that runs them
//! - `dispatcher`: `send` / `emit` on the caller side
//! - `correlation`: pending requests keyed by correlation id
//! - `error`: error envelopes and the handler error translator
//! - `codec`: payload serialization and Kafka message normalization
//! - `app`: composition root wiring all of the above

pub mod app;
pub mod bus;
pub mod codec;
pub mod config;
pub mod correlation;
pub mod dispatcher;
pub mod error;
pub mod handlers;
mod signal;

pub use app::{App, AppError, RunningApp};
pub use config::{ClientConfig, ConfigError, ConsumerConfig, DispatcherConfig, KafkaOptions};
pub use dispatcher::{DispatchError, Dispatcher};
pub use error::{ErrorEnvelope, ErrorKind};
pub use handlers::{Context, HandlerError, HandlerMode, HandlerRegistry, Headers, Server};
pub use signal::{wait_until, Signal};
