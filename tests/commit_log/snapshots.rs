//! Snapshot Tests
//!
//! Save/load keeps value and runtime type; heads reset on save.

use crate::common::*;
use chronolog::prelude::*;
use std::collections::HashMap;

/// Untyped-looking aggregate state: a map of lists
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct Balances(HashMap<String, Vec<i32>>);

impl PayloadType for Balances {
    const TYPE_NAME: &'static str = "tests.Balances";
}

fn balances() -> Balances {
    let mut map = HashMap::new();
    map.insert("checking".to_string(), vec![1, 2, 3]);
    map.insert("savings".to_string(), vec![]);
    Balances(map)
}

#[test]
fn save_then_load_returns_same_value_and_type() {
    let log = sync_log();
    for rev in 1..=4 {
        log.commit(attempt(&log, "S1", rev, rev)).unwrap();
    }
    let payload = log.encode(&balances()).unwrap();
    assert!(log
        .add_snapshot(&Snapshot::new(key("S1"), 4, payload.clone()))
        .unwrap());

    let loaded = log.get_snapshot(&key("S1"), 4).unwrap().unwrap();
    assert_eq!(loaded.payload, payload);
    assert!(loaded.payload.is::<Balances>());
    assert!(!loaded.payload.is::<SimpleMessage>());
    assert_eq!(log.decode::<Balances>(&loaded.payload).unwrap(), balances());

    let above = log.get_snapshot(&key("S1"), 100).unwrap().unwrap();
    assert_eq!(above.stream_revision, 4);
}

#[test]
fn decoding_as_wrong_type_is_serialization_error() {
    let log = sync_log();
    let payload = log.encode(&balances()).unwrap();
    let err = log.decode::<SimpleMessage>(&payload).unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
}

#[test]
fn later_snapshots_supersede_earlier_ones() {
    let log = sync_log();
    for rev in 1..=10 {
        log.commit(attempt(&log, "S1", rev, rev)).unwrap();
    }
    for rev in [3u64, 7] {
        let payload = log.encode(&SimpleMessage::new(&rev.to_string())).unwrap();
        log.add_snapshot(&Snapshot::new(key("S1"), rev, payload)).unwrap();
    }

    assert_eq!(log.get_snapshot(&key("S1"), 6).unwrap().unwrap().stream_revision, 3);
    assert_eq!(log.get_snapshot(&key("S1"), 10).unwrap().unwrap().stream_revision, 7);
    assert!(log.get_snapshot(&key("S1"), 2).unwrap().is_none());

    let head = log.stream_head(&key("S1")).unwrap().unwrap();
    assert_eq!(head.snapshot_revision, Some(7));
    assert_eq!(head.unsnapshotted, 3);
}

#[test]
fn duplicate_snapshot_revision_keeps_original() {
    let log = sync_log();
    log.commit(attempt(&log, "S1", 1, 1)).unwrap();
    let original = log.encode(&SimpleMessage::new("original")).unwrap();
    let replacement = log.encode(&SimpleMessage::new("replacement")).unwrap();

    assert!(log.add_snapshot(&Snapshot::new(key("S1"), 1, original.clone())).unwrap());
    assert!(!log.add_snapshot(&Snapshot::new(key("S1"), 1, replacement)).unwrap());
    assert_eq!(log.get_snapshot(&key("S1"), 1).unwrap().unwrap().payload, original);
}

#[test]
fn snapshot_takes_stream_off_the_due_list() {
    let log = sync_log();
    for rev in 1..=5 {
        log.commit(attempt(&log, "S1", rev, rev)).unwrap();
    }
    assert_eq!(log.streams_to_snapshot("default", 5).count(), 1);

    let payload = log.encode(&balances()).unwrap();
    log.add_snapshot(&Snapshot::new(key("S1"), 5, payload)).unwrap();
    assert_eq!(log.streams_to_snapshot("default", 5).count(), 0);
}
