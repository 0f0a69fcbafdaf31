//! Deadlines, late replies and cancellation.

use std::thread;
use std::time::Duration;

use brokered_rust::bus::{Envelope, InMemoryBroker, CORRELATION_ID};
use brokered_rust::{wait_until, App, DispatchError, RunningApp};
use serde_json::json;

use crate::handlers::AppState;
use crate::support::{fast_options, init_tracing, registry};

/// An app that also expects replies for `billing.charge`, which nobody serves.
fn app_with_unserved_pattern(broker: &InMemoryBroker, group: &str) -> RunningApp<InMemoryBroker> {
    init_tracing();
    App::new(broker.clone(), fast_options(group), registry(AppState::default()))
        .response_of("billing.charge")
        .start()
        .unwrap()
}

#[test]
fn unanswered_request_times_out() {
    let broker = InMemoryBroker::new();
    let app = app_with_unserved_pattern(&broker, "timeout-basic");

    let err = app
        .dispatcher()
        .send_with_timeout("billing.charge", json!({ "amount": 10 }), Duration::from_millis(50))
        .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(
        err,
        DispatchError::Timeout {
            pattern: "billing.charge".into(),
            timeout_ms: 50
        }
    );
    assert!(app.dispatcher().registry().is_empty());
    app.close();
}

#[test]
fn late_spoofed_reply_is_dropped() {
    let broker = InMemoryBroker::new();
    let app = app_with_unserved_pattern(&broker, "timeout-late");

    let err = app
        .dispatcher()
        .send_with_timeout("billing.charge", json!({}), Duration::from_millis(30))
        .unwrap_err();
    assert!(err.is_timeout());

    let request = broker.records("billing.charge")[0].envelope.clone();
    let correlation_id = request.correlation_id().unwrap().to_string();
    let spoofed = Envelope::new("billing.charge.reply", b"\"paid\"".to_vec())
        .with_header(CORRELATION_ID, correlation_id);
    app.client().publish(spoofed).unwrap();

    // The reply consumer acks the spoofed record without settling anything.
    assert!(wait_until(Duration::from_secs(1), || broker
        .acknowledged()
        .iter()
        .any(|(_, topic, _, _)| topic == "billing.charge.reply")));
    assert!(app.dispatcher().registry().is_empty());

    // The dispatcher keeps working.
    let user = json!({ "email": "a@b.c", "name": "Ada", "phone": "1", "years": 36 });
    assert_eq!(app.dispatcher().send("user.create", &user).unwrap(), user);
    app.close();
}

#[test]
fn cancelled_request_returns_timeout() {
    let broker = InMemoryBroker::new();
    let app = app_with_unserved_pattern(&broker, "timeout-cancel");
    let dispatcher = app.dispatcher().clone();

    let caller = thread::spawn(move || {
        dispatcher.send_with_timeout("billing.charge", json!({}), Duration::from_secs(10))
    });

    assert!(wait_until(Duration::from_secs(1), || app.dispatcher().registry().len() == 1));
    let pending = app.dispatcher().registry().pending();
    assert_eq!(pending[0].pattern, "billing.charge");
    assert!(app.dispatcher().cancel(&pending[0].correlation_id));

    let result = caller.join().unwrap();
    assert!(matches!(result, Err(DispatchError::Timeout { .. })));
    assert!(!app.dispatcher().cancel(&pending[0].correlation_id));
    app.close();
}
