//! Broker client adapter - transport abstractions
//!
//! This module provides the envelope carried on the broker, the traits a
//! broker implementation provides, and the `BrokerClient` that owns the
//! connection on behalf of the dispatcher and the server.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │               BrokerClient (per service)                    │
//! │  - connect() with backoff / reconnect / connection events   │
//! │  - publish() with one retry on transient failures           │
//! │  - subscribe(topics, group) -> consumer thread              │
//! └─────────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │            Broker = Publisher + Subscriber + connect         │
//! │  Publisher: publish(envelope) / publish_batch(envelopes)    │
//! │  Subscriber: poll(topics, group, timeout) / ack(record)     │
//! └─────────────────────────────────────────────────────────────┘
//!          │                  │                     │
//!          ▼                  ▼                     ▼
//! ┌──────────────┐    ┌─────────────┐    ┌─────────────────────┐
//! │InMemoryBroker│    │    Kafka    │    │  Redpanda / other   │
//! │  (included)  │    │ (external)  │    │     (external)      │
//! └──────────────┘    └─────────────┘    └─────────────────────┘
//! ```

mod broker;
mod client;
mod envelope;
mod error;
mod in_memory_broker;
mod publisher;
mod retry;
mod subscriber;
mod subscription;

pub use broker::Broker;
pub use client::{
    BrokerClient, ConnectionState, CONNECTION_ESTABLISHED, CONNECTION_LOST, CONNECTION_RESTORED,
};
pub use envelope::{Envelope, CORRELATION_ID, ERROR, IS_DISPOSED, REPLY_PARTITION, REPLY_TOPIC};
pub use error::{ConnectionError, PublishError};
pub use in_memory_broker::InMemoryBroker;
pub use publisher::{Publisher, RecordMetadata};
pub use retry::RetryPolicy;
pub use subscriber::{Record, Subscriber};
pub use subscription::{ConsumerStats, Subscription};
