//! Serialization Tests
//!
//! Headers and bodies come back from storage with values and runtime
//! types intact, under either serializer.

use crate::common::*;
use chronolog::prelude::*;
use std::collections::BTreeMap;
use tempfile::TempDir;
use uuid::Uuid;

fn rich_attempt(log: &Chronolog, message: &SimpleMessage) -> CommitAttempt {
    let body = log.encode(message).unwrap();
    let nested = log.encode(&SimpleMessage::new("nested")).unwrap();
    let mut object = BTreeMap::new();
    object.insert("flag".to_string(), Value::Bool(true));
    object.insert("ratio".to_string(), Value::Float(0.25));

    CommitAttempt::new(
        key("S1"),
        2,
        1,
        vec![
            EventMessage::new(body.clone()).with_header("position", 1i64),
            EventMessage::new(body).with_header("position", 2i64),
        ],
    )
    .with_header("user", "alice")
    .with_header("attempts", 3i64)
    .with_header("correlation", Uuid::new_v4())
    .with_header("origin", nested)
    .with_header("meta", Value::Object(object))
    .with_header("raw", Value::Bytes(vec![0, 1, 2, 255]))
    .with_header("none", Value::Null)
}

fn check_round_trip(log: &Chronolog) {
    let message = SimpleMessage::new("body");
    let sent = rich_attempt(log, &message);
    let headers = sent.headers.clone();
    log.commit(sent).unwrap();

    let read = log.get_from(CheckpointToken::ZERO).unwrap();
    let commit = &read[0];
    assert_eq!(commit.headers, headers);
    assert_eq!(commit.headers["attempts"].as_int(), Some(3));
    assert_eq!(commit.headers["user"].as_str(), Some("alice"));
    assert!(commit.headers["correlation"].as_uuid().is_some());

    let origin = commit.headers["origin"].as_payload().unwrap();
    assert!(origin.is::<SimpleMessage>());
    assert_eq!(log.decode::<SimpleMessage>(origin).unwrap().value, "nested");

    assert_eq!(commit.events.len(), 2);
    for (i, event) in commit.events.iter().enumerate() {
        assert_eq!(event.headers["position"].as_int(), Some(i as i64 + 1));
        assert_eq!(log.decode::<SimpleMessage>(&event.body).unwrap(), message);
    }
}

#[test]
fn msgpack_round_trip_in_memory() {
    check_round_trip(&sync_log());
}

#[test]
fn json_round_trip_in_memory() {
    init_tracing();
    let log = Chronolog::builder()
        .serializer(SerializerKind::Json)
        .open()
        .unwrap();
    check_round_trip(&log);
}

#[test]
fn headers_survive_the_log_file() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    for serializer in [SerializerKind::MsgPack, SerializerKind::Json] {
        let path = dir.path().join(format!("{:?}", serializer));
        {
            let log = Chronolog::builder()
                .path(&path)
                .serializer(serializer)
                .open()
                .unwrap();
            check_round_trip(&log);
        }
        let reopened = Chronolog::builder()
            .path(&path)
            .serializer(serializer)
            .open()
            .unwrap();
        let commits = reopened.get_from(CheckpointToken::ZERO).unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].events.len(), 2);
        assert_eq!(commits[0].headers["user"].as_str(), Some("alice"));
    }
}

#[test]
fn event_order_is_preserved() {
    let log = sync_log();
    let events: Vec<EventMessage> = (0..50)
        .map(|i| EventMessage::new(log.encode(&SimpleMessage::new(&i.to_string())).unwrap()))
        .collect();
    log.commit(CommitAttempt::new(key("S1"), 50, 1, events)).unwrap();

    let commit = log.get_stream(&key("S1"), 1, 50).unwrap().remove(0);
    let values: Vec<String> = commit
        .events
        .iter()
        .map(|e| log.decode::<SimpleMessage>(&e.body).unwrap().value)
        .collect();
    let expected: Vec<String> = (0..50).map(|i| i.to_string()).collect();
    assert_eq!(values, expected);
}
