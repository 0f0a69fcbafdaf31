//! Error envelopes and the translator from handler failures.
//!
//! Handler failures never cross the wire raw: request/reply failures are
//! turned into an `ErrorEnvelope` with a stable `ErrorKind`, fire-and-forget
//! failures are logged and dropped.

mod envelope;
mod translate;

pub use envelope::{ErrorEnvelope, ErrorKind};
pub use translate::{translate, translate_panic, INTERNAL_MESSAGE};
