//! Shared helpers for integration tests

#![allow(dead_code)]

use chronolog::prelude::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Install a test-friendly tracing subscriber once per process
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Event body used across the suites
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleMessage {
    pub id: Uuid,
    pub value: String,
    pub created: DateTime<Utc>,
    pub count: i32,
    pub contents: Vec<String>,
}

impl PayloadType for SimpleMessage {
    const TYPE_NAME: &'static str = "tests.SimpleMessage";
}

impl SimpleMessage {
    pub fn new(value: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            value: value.to_string(),
            created: Utc::now(),
            count: 1234,
            contents: vec!["a".into(), "b".into(), "c".into()],
        }
    }
}

/// In-memory log with heads written inline
pub fn sync_log() -> Chronolog {
    init_tracing();
    Chronolog::builder()
        .head_tracking(HeadTracking::Synchronous)
        .open()
        .expect("ephemeral log")
}

pub fn key(stream: &str) -> StreamKey {
    StreamKey::new("default", stream)
}

/// One-event attempt whose body is a `SimpleMessage`
pub fn attempt(log: &Chronolog, stream: &str, revision: u64, sequence: u64) -> CommitAttempt {
    let body = log
        .encode(&SimpleMessage::new(&format!("{}@{}", stream, revision)))
        .expect("encode body");
    CommitAttempt::new(key(stream), revision, sequence, vec![EventMessage::new(body)])
}

/// Attempt carrying `events` events ending at `revision`
pub fn batch(log: &Chronolog, stream: &str, revision: u64, sequence: u64, events: usize) -> CommitAttempt {
    let events = (0..events)
        .map(|i| {
            let body = log
                .encode(&SimpleMessage::new(&format!("{}#{}", stream, i)))
                .expect("encode body");
            EventMessage::new(body)
        })
        .collect();
    CommitAttempt::new(key(stream), revision, sequence, events)
}
