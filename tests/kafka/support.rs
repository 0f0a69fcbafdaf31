//! Shared setup: tracing, fast options, a running app with all fixtures.

use brokered_rust::bus::InMemoryBroker;
use brokered_rust::{App, HandlerRegistry, KafkaOptions, RunningApp};
use tracing_subscriber::EnvFilter;

use crate::handlers::{self, AppState};

/// Install a test subscriber once. `RUST_LOG=brokered_rust=debug` shows the flow.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Options with short polls and backoff so tests stay fast.
pub fn fast_options(group: &str) -> KafkaOptions {
    let mut options = KafkaOptions::default();
    options.client.client_id = format!("{group}-client");
    options.client.retry.max_attempts = 3;
    options.client.retry.initial_backoff_ms = 1;
    options.client.retry.max_backoff_ms = 5;
    options.consumer.group_id = group.to_string();
    options.consumer.poll_interval_ms = 5;
    options.consumer.consumers = 2;
    options.dispatcher.request_timeout_ms = 2_000;
    options.dispatcher.sweep_interval_ms = 20;
    options
}

/// All fixture handlers, registered by convention.
pub fn registry(state: AppState) -> HandlerRegistry<AppState> {
    brokered_rust::register_handlers!(
        HandlerRegistry::new(state),
        handlers::math_sum_kafka_message,
        handlers::math_sum_without_key,
        handlers::math_sum_plain_object,
        handlers::math_sum_array,
        handlers::math_sum_string,
        handlers::math_sum_number,
        handlers::notify,
        handlers::user_create,
        handlers::business_create,
    )
    .unwrap()
}

/// A started app over `broker` with every fixture. Returns the state for
/// assertions on side effects.
pub fn start_app(broker: &InMemoryBroker, group: &str) -> (RunningApp<InMemoryBroker>, AppState) {
    init_tracing();
    let state = AppState::default();
    let app = App::new(broker.clone(), fast_options(group), registry(state.clone()))
        .start()
        .unwrap();
    (app, state)
}
