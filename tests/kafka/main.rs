//! Kafka-style transport integration tests.
//!
//! A full service (server + dispatcher) runs against `InMemoryBroker`;
//! tests drive it through `send` / `emit` like a remote caller would.

mod support;
mod handlers;
mod sum;
mod notify;
mod commands;
mod timeout;
mod errors;
