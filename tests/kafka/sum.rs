//! Every accepted encoding of `[1, 2, 3, 4, 5]` sums to 15.

use brokered_rust::bus::InMemoryBroker;
use brokered_rust::ErrorKind;
use proptest::prelude::*;
use proptest::test_runner::{Config, TestRunner};
use serde_json::{json, Value};

use crate::support::start_app;

#[test]
fn sum_kafka_message_with_key() {
    let (app, _) = start_app(&InMemoryBroker::new(), "sum-keyed");
    let result = app
        .dispatcher()
        .send(
            "math.sum.sync.kafka.message",
            json!({ "key": "1", "value": { "numbers": [1, 2, 3, 4, 5] } }),
        )
        .unwrap();
    assert_eq!(result, json!(15));
    app.close();
}

#[test]
fn sum_kafka_message_travels_with_key() {
    let broker = InMemoryBroker::new();
    let (app, _) = start_app(&broker, "sum-key-wire");
    app.dispatcher()
        .send(
            "math.sum.sync.kafka.message",
            json!({ "key": 42, "value": { "numbers": [1] }, "headers": { "x-trace": "t-1" } }),
        )
        .unwrap();

    let request = &broker.records("math.sum.sync.kafka.message")[0].envelope;
    assert_eq!(request.key.as_deref(), Some("42"));
    assert_eq!(request.header("x-trace"), Some("t-1"));
    assert_eq!(request.payload_str(), Some(r#"{"numbers":[1]}"#));
    app.close();
}

#[test]
fn sum_value_only_message() {
    let (app, _) = start_app(&InMemoryBroker::new(), "sum-value");
    let result = app
        .dispatcher()
        .send(
            "math.sum.sync.without.key",
            json!({ "value": { "numbers": [1, 2, 3, 4, 5] } }),
        )
        .unwrap();
    assert_eq!(result, json!(15));
    app.close();
}

#[test]
fn sum_plain_object() {
    let (app, _) = start_app(&InMemoryBroker::new(), "sum-object");
    let result: i64 = app
        .dispatcher()
        .send_as("math.sum.sync.plain.object", json!({ "numbers": [1, 2, 3, 4, 5] }))
        .unwrap();
    assert_eq!(result, 15);
    app.close();
}

#[test]
fn sum_array() {
    let (app, _) = start_app(&InMemoryBroker::new(), "sum-array");
    let result = app
        .dispatcher()
        .send("math.sum.sync.array", [1, 2, 3, 4, 5])
        .unwrap();
    assert_eq!(result, json!(15));
    app.close();
}

#[test]
fn sum_string() {
    let (app, _) = start_app(&InMemoryBroker::new(), "sum-string");
    let result = app
        .dispatcher()
        .send("math.sum.sync.string", "1,2,3,4,5")
        .unwrap();
    assert_eq!(result, json!(15));
    app.close();
}

#[test]
fn sum_number_adds_digits() {
    let (app, _) = start_app(&InMemoryBroker::new(), "sum-number");
    let dispatcher = app.dispatcher();
    assert_eq!(dispatcher.send("math.sum.sync.number", json!([12345])).unwrap(), json!(15));
    assert_eq!(dispatcher.send("math.sum.sync.number", 12345).unwrap(), json!(15));

    let err = dispatcher
        .send("math.sum.sync.number", json!([1, 2]))
        .unwrap_err();
    assert_eq!(err.envelope().unwrap().kind, ErrorKind::Validation);
    app.close();
}

#[test]
fn sum_mixed_numbers_is_float() {
    let (app, _) = start_app(&InMemoryBroker::new(), "sum-float");
    let result = app
        .dispatcher()
        .send("math.sum.sync.array", json!([1, 2.5]))
        .unwrap();
    assert_eq!(result, json!(3.5));
    app.close();
}

#[test]
fn encodings_agree_on_random_inputs() {
    let (app, _) = start_app(&InMemoryBroker::new(), "sum-prop");
    let dispatcher = app.dispatcher().clone();

    let mut runner = TestRunner::new(Config {
        cases: 24,
        ..Config::default()
    });
    runner
        .run(&prop::collection::vec(-1_000i64..1_000, 1..12), |numbers| {
            let expected = json!(numbers.iter().sum::<i64>());
            let joined = numbers
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(",");

            let encodings: [(&str, Value); 5] = [
                ("math.sum.sync.array", json!(numbers)),
                ("math.sum.sync.plain.object", json!({ "numbers": numbers })),
                (
                    "math.sum.sync.kafka.message",
                    json!({ "key": "k", "value": { "numbers": numbers } }),
                ),
                ("math.sum.sync.without.key", json!({ "value": { "numbers": numbers } })),
                ("math.sum.sync.string", json!(joined)),
            ];
            for (pattern, payload) in encodings {
                let result = dispatcher.send(pattern, payload).unwrap();
                prop_assert_eq!(&result, &expected, "pattern {}", pattern);
            }
            Ok(())
        })
        .unwrap();

    app.close();
}
