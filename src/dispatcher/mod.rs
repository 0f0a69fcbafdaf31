//! dispatcher: the caller side: `send` and `emit`.
//!
//! `send` allocates a correlation id, registers a pending request and
//! publishes the request on the pattern's topic with the correlation and
//! reply-topic headers. The reply consumer settles the request when the
//! answer arrives on `<pattern>.reply`; `send` returns the value, the
//! handler's error envelope, or a timeout.
//!
//! `emit` publishes an event and returns as soon as the broker has it.

mod caller;
mod error;
mod reply;

pub use caller::{Dispatcher, DispatcherBuilder};
pub use error::DispatchError;
