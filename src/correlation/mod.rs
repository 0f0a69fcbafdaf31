//! correlation: in-flight requests keyed by correlation id.
//!
//! `send` registers a pending request, blocks on its `PendingHandle`, and the
//! reply consumer settles it with `resolve` or `fail`. Requests past their
//! deadline are failed with a `timeout` error envelope, either by the waiter
//! itself or by the `Sweeper`.
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use brokered_rust::correlation::CorrelationRegistry;
//! use serde_json::json;
//!
//! let registry = CorrelationRegistry::new();
//! let handle = registry.register("c-1", "math.sum", Duration::from_secs(1)).unwrap();
//!
//! assert!(registry.resolve("c-1", json!(15)));
//! assert_eq!(handle.wait(), Ok(json!(15)));
//!
//! // A second reply for the same id is dropped.
//! assert!(!registry.resolve("c-1", json!(16)));
//! ```

mod pending;
mod registry;
mod sweeper;

pub use pending::{PendingHandle, PendingRequest, SlotState};
pub use registry::{CorrelationError, CorrelationRegistry, ReplyResult};
pub use sweeper::Sweeper;
