//! Commands that echo the created entity, alone and under concurrency.

use std::collections::HashSet;
use std::thread;

use brokered_rust::bus::InMemoryBroker;
use serde_json::Value;

use crate::handlers::business_create::Business;
use crate::handlers::user_create::User;
use crate::support::start_app;

fn user() -> User {
    User {
        email: "enriquebenavidesm@gmail.com".into(),
        name: "Ben".into(),
        phone: "1112223331".into(),
        years: 33,
    }
}

#[test]
fn create_user() {
    let (app, state) = start_app(&InMemoryBroker::new(), "cmd-user");
    let created: User = app.dispatcher().send_as("user.create", user()).unwrap();
    assert_eq!(created, user());
    assert_eq!(*state.users.lock(), vec!["Ben".to_string()]);
    app.close();
}

#[test]
fn create_business() {
    let (app, _) = start_app(&InMemoryBroker::new(), "cmd-business");
    let business = Business {
        name: "Example".into(),
        phone: "2233441122".into(),
        user: user(),
    };
    let created: Business = app
        .dispatcher()
        .send_as("business.create", business.clone())
        .unwrap();
    assert_eq!(created, business);
    app.close();
}

#[test]
fn hundred_concurrent_creates_resolve_to_their_own_caller() {
    let broker = InMemoryBroker::with_partitions(3);
    let (app, state) = start_app(&broker, "cmd-concurrent");

    let callers: Vec<_> = (0..100)
        .map(|i| {
            let dispatcher = app.dispatcher().clone();
            thread::spawn(move || {
                let mut input = user();
                input.name = format!("Ben+{i}");
                let reply = dispatcher.send("user.create", &input).unwrap();
                (input.name, reply)
            })
        })
        .collect();

    for caller in callers {
        let (name, reply) = caller.join().unwrap();
        assert_eq!(reply["name"], Value::String(name));
    }

    let names: HashSet<String> = state.users.lock().iter().cloned().collect();
    assert_eq!(names.len(), 100);
    assert!(app.dispatcher().registry().is_empty());

    let stats = app.close();
    assert_eq!(stats.replies, 100);
}

#[test]
fn each_reply_carries_its_correlation_id() {
    let broker = InMemoryBroker::new();
    let (app, _) = start_app(&broker, "cmd-wire");
    app.dispatcher().send("user.create", user()).unwrap();

    let request = &broker.records("user.create")[0].envelope;
    let reply = &broker.records("user.create.reply")[0].envelope;
    assert_eq!(request.reply_topic(), Some("user.create.reply"));
    assert_eq!(request.correlation_id(), reply.correlation_id());
    assert_eq!(reply.header(brokered_rust::bus::IS_DISPOSED), Some("1"));
    assert!(!reply.is_error());
    app.close();
}
