//! Stream Head Tracking Tests
//!
//! The three tracking modes and the snapshot-eligibility walk.

use crate::common::*;
use chronolog::prelude::*;

fn log_with(mode: HeadTracking) -> Chronolog {
    init_tracing();
    Chronolog::builder().head_tracking(mode).open().unwrap()
}

#[test]
fn disabled_tracking_never_reports_streams() {
    let log = log_with(HeadTracking::Disabled);
    for n in [1u64, 10, 100] {
        let stream = format!("s{}", n);
        for rev in 1..=n {
            log.commit(attempt(&log, &stream, rev, rev)).unwrap();
        }
        assert_eq!(log.streams_to_snapshot("default", 0).count(), 0);
        assert_eq!(log.streams_to_snapshot("default", 1).count(), 0);
        assert!(log.stream_head(&key(&stream)).unwrap().is_none());
    }
}

#[test]
fn background_heads_converge_after_flush() {
    let log = log_with(HeadTracking::Background);
    for rev in 1..=200 {
        log.commit(attempt(&log, "S1", rev, rev)).unwrap();
    }
    log.flush_heads();

    let head = log.stream_head(&key("S1")).unwrap().unwrap();
    assert_eq!(head.head_revision, 200);
    assert_eq!(head.unsnapshotted, 200);
    let stats = log.head_worker_stats();
    assert_eq!(stats.applied, 200);
    assert_eq!(stats.failed, 0);
}

#[test]
fn synchronous_heads_count_events_not_commits() {
    let log = sync_log();
    log.commit(batch(&log, "S1", 3, 1, 3)).unwrap();
    log.commit(batch(&log, "S1", 5, 2, 2)).unwrap();

    let head = log.stream_head(&key("S1")).unwrap().unwrap();
    assert_eq!(head.head_revision, 5);
    assert_eq!(head.unsnapshotted, 5);
    assert_eq!(head.snapshot_revision, None);
}

#[test]
fn snapshot_walk_is_restartable() {
    let log = sync_log();
    for i in 0..25 {
        let stream = format!("busy-{:02}", i);
        for rev in 1..=3 {
            log.commit(attempt(&log, &stream, rev, rev)).unwrap();
        }
    }
    log.commit(attempt(&log, "idle", 1, 1)).unwrap();

    // a scheduler handles ten streams, then stops
    let mut walk = log.streams_to_snapshot("default", 3).with_page_size(4);
    let first: Vec<StreamHead> = walk.by_ref().take(10).map(|h| h.unwrap()).collect();
    let cursor = walk.cursor().cloned().unwrap();
    drop(walk);

    // and later picks up where it left off
    let rest: Vec<StreamHead> = log
        .streams_to_snapshot("default", 3)
        .resume_after(cursor)
        .map(|h| h.unwrap())
        .collect();

    assert_eq!(first.len() + rest.len(), 25);
    assert!(first
        .iter()
        .chain(rest.iter())
        .all(|h| h.key.stream_id.starts_with("busy-")));
    assert_eq!(rest[0].key.stream_id, "busy-10");
}
