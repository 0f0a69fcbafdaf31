//! Fire-and-forget events.

use std::time::Duration;

use brokered_rust::bus::InMemoryBroker;
use brokered_rust::wait_until;
use serde_json::json;

use crate::support::start_app;

#[test]
fn notify_is_observed_within_a_second() {
    let (app, state) = start_app(&InMemoryBroker::new(), "notify");
    assert!(!state.notified.is_set());

    app.dispatcher().emit("notify", json!({ "notify": true })).unwrap();

    assert!(state.notified.wait_timeout(Duration::from_secs(1)));
    assert!(app.dispatcher().registry().is_empty());
    app.close();
}

#[test]
fn emit_does_not_wait_for_the_handler() {
    let broker = InMemoryBroker::new();
    let (app, _) = start_app(&broker, "notify-nowait");

    app.dispatcher().emit("notify", json!(null)).unwrap();
    assert!(wait_until(Duration::from_secs(1), || app.server_stats().handled == 1));

    // No reply topic is ever written for an event.
    assert!(broker.records("notify.reply").is_empty());
    app.close();
}

#[test]
fn event_to_request_pattern_runs_without_reply() {
    let broker = InMemoryBroker::new();
    let (app, _) = start_app(&broker, "notify-request-pattern");

    app.dispatcher()
        .emit("math.sum.sync.array", json!([1, 2]))
        .unwrap();
    assert!(wait_until(Duration::from_secs(1), || app.server_stats().handled == 1));

    // The handler ran but nobody waits, so no reply is published.
    let stats = app.server_stats();
    assert_eq!(stats.replies, 0);
    assert_eq!(stats.failed, 0);
    assert!(broker.records("math.sum.sync.array.reply").is_empty());
    app.close();
}
