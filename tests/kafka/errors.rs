//! Handler failures travel back as error envelopes.

use brokered_rust::bus::InMemoryBroker;
use brokered_rust::error::INTERNAL_MESSAGE;
use brokered_rust::handlers::RegistryError;
use brokered_rust::{App, DispatchError, ErrorKind, HandlerRegistry};
use serde_json::json;

use crate::handlers::{self, AppState};
use crate::support::{fast_options, init_tracing, registry, start_app};

fn handler_error(result: Result<serde_json::Value, DispatchError>) -> brokered_rust::ErrorEnvelope {
    match result {
        Err(DispatchError::Handler(envelope)) => envelope,
        other => panic!("expected a handler error, got {other:?}"),
    }
}

#[test]
fn business_rule_violation_is_validation() {
    let (app, state) = start_app(&InMemoryBroker::new(), "err-rule");
    let envelope = handler_error(app.dispatcher().send(
        "user.create",
        json!({ "email": "a@b.c", "name": "Baby", "phone": "1", "years": 0 }),
    ));

    assert_eq!(envelope.kind, ErrorKind::Validation);
    assert_eq!(envelope.message, "rejected: years must be positive");
    assert_eq!(envelope.pattern, "user.create");
    assert_eq!(envelope.kind.status_code(), 400);
    assert!(state.users.lock().is_empty());
    app.close();
}

#[test]
fn guard_rejection_is_validation() {
    let (app, _) = start_app(&InMemoryBroker::new(), "err-guard");
    let envelope = handler_error(app.dispatcher().send("user.create", json!({ "name": "Ben" })));
    assert_eq!(envelope.kind, ErrorKind::Validation);
    assert!(envelope.message.contains("guard rejected"));
    app.close();
}

#[test]
fn undecodable_input_is_validation() {
    let (app, _) = start_app(&InMemoryBroker::new(), "err-decode");
    let envelope = handler_error(
        app.dispatcher()
            .send("math.sum.sync.plain.object", json!({ "numbers": "abc" })),
    );
    assert_eq!(envelope.kind, ErrorKind::Validation);
    app.close();
}

#[test]
fn request_to_event_pattern_is_not_found() {
    init_tracing();
    let state = AppState::default();
    let app = App::new(InMemoryBroker::new(), fast_options("err-event"), registry(state.clone()))
        .response_of("notify")
        .start()
        .unwrap();

    let envelope = handler_error(app.dispatcher().send("notify", json!({})));
    assert_eq!(envelope.kind, ErrorKind::NotFound);
    assert_eq!(envelope.pattern, "notify");
    assert!(!state.notified.is_set());
    app.close();
}

#[test]
fn panic_becomes_generic_internal_error() {
    init_tracing();
    let registry = registry(AppState::default())
        .message("explode", |_| panic!("connection string postgres://secret"))
        .unwrap();
    let app = App::new(InMemoryBroker::new(), fast_options("err-panic"), registry)
        .start()
        .unwrap();

    let envelope = handler_error(app.dispatcher().send("explode", json!({})));
    assert_eq!(envelope.kind, ErrorKind::Internal);
    assert_eq!(envelope.message, INTERNAL_MESSAGE);
    assert!(!envelope.message.contains("secret"));

    // The consumer thread survived the panic.
    let sum = app.dispatcher().send("math.sum.sync.array", [1, 2]).unwrap();
    assert_eq!(sum, json!(3));
    app.close();
}

#[test]
fn duplicate_handler_fails_at_registration() {
    let result = brokered_rust::register_handlers!(
        HandlerRegistry::new(AppState::default()),
        handlers::notify,
        handlers::user_create,
        handlers::notify,
    );
    assert!(matches!(
        result,
        Err(RegistryError::DuplicatePattern(ref pattern)) if pattern == "notify"
    ));
}
