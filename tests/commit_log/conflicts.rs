//! Conflict Tests
//!
//! Duplicate sequences, overlapping revisions and resent commits.

use crate::common::*;
use chronolog::prelude::*;

#[test]
fn duplicate_sequence_conflicts_and_first_survives() {
    let log = sync_log();
    let first = log.commit(attempt(&log, "S1", 1, 1)).unwrap();

    let err = log.commit(attempt(&log, "S1", 2, 1)).unwrap_err();
    match err {
        Error::ConcurrencyConflict {
            key: conflict_key,
            kind,
            head_revision,
        } => {
            assert_eq!(conflict_key, key("S1"));
            assert_eq!(kind, ConflictKind::CommitSequence);
            assert_eq!(head_revision, 1);
        }
        other => panic!("expected conflict, got {other}"),
    }

    assert_eq!(log.get_stream(&key("S1"), 0, u64::MAX).unwrap(), vec![first]);
}

#[test]
fn overlapping_revisions_conflict() {
    let log = sync_log();
    log.commit(batch(&log, "S1", 3, 1, 3)).unwrap();
    let err = log.commit(batch(&log, "S1", 4, 2, 2)).unwrap_err();
    assert_eq!(err.conflict_kind(), Some(ConflictKind::RevisionOverlap));
}

#[test]
fn resent_commit_is_detected() {
    let log = sync_log();
    let original = attempt(&log, "S1", 1, 1);
    log.commit(original.clone()).unwrap();

    let err = log.commit(original).unwrap_err();
    assert_eq!(err.conflict_kind(), Some(ConflictKind::DuplicateCommit));
    assert!(err.is_conflict());
}

#[test]
fn caller_can_rebase_on_reported_head() {
    let log = sync_log();
    log.commit(attempt(&log, "S1", 1, 1)).unwrap();
    log.commit(attempt(&log, "S1", 2, 2)).unwrap();

    // a writer that still believes the stream is at revision 1
    let stale = attempt(&log, "S1", 2, 2);
    let head_revision = match log.commit(stale) {
        Err(Error::ConcurrencyConflict { head_revision, .. }) => head_revision,
        other => panic!("expected conflict, got {other:?}"),
    };
    let rebased = log
        .commit(attempt(&log, "S1", head_revision + 1, 3))
        .unwrap();
    assert_eq!(rebased.stream_revision, 3);
}

#[test]
fn same_stream_name_in_other_bucket_is_independent() {
    let log = sync_log();
    log.commit(attempt(&log, "S1", 1, 1)).unwrap();
    let mut other = attempt(&log, "S1", 1, 1);
    other.key = StreamKey::new("tenant-b", "S1");
    log.commit(other).unwrap();
    assert_eq!(log.get_from(CheckpointToken::ZERO).unwrap().len(), 2);
}
