//! Basic Append Scenario
//!
//! Two commits to one stream, read back by checkpoint.

use crate::common::*;
use chronolog::prelude::*;

#[test]
fn two_commits_read_back_in_checkpoint_order() {
    let log = sync_log();

    let a = log.commit(attempt(&log, "S1", 1, 1)).unwrap();
    let b = log.commit(attempt(&log, "S1", 2, 2)).unwrap();
    assert_eq!(a.checkpoint_token, CheckpointToken::new(1));
    assert_eq!(b.checkpoint_token, CheckpointToken::new(2));

    let read = log
        .get_range(CheckpointToken::new(1), CheckpointToken::new(2))
        .unwrap();
    assert_eq!(read, vec![a, b]);

    let head = log.stream_head(&key("S1")).unwrap().unwrap();
    assert_eq!(head.head_revision, 2);
}

#[test]
fn get_from_is_exclusive() {
    let log = sync_log();
    for rev in 1..=3 {
        log.commit(attempt(&log, "S1", rev, rev)).unwrap();
    }
    let tokens: Vec<u64> = log
        .get_from(CheckpointToken::new(1))
        .unwrap()
        .iter()
        .map(|c| c.checkpoint_token.as_u64())
        .collect();
    assert_eq!(tokens, vec![2, 3]);
    assert_eq!(log.get_page(CheckpointToken::ZERO, 2).unwrap().len(), 2);
}

#[test]
fn stream_read_by_revision_window() {
    let log = sync_log();
    log.commit(batch(&log, "S1", 3, 1, 3)).unwrap();
    log.commit(batch(&log, "S1", 5, 2, 2)).unwrap();
    log.commit(batch(&log, "S1", 6, 3, 1)).unwrap();

    let window = log.get_stream(&key("S1"), 4, 5).unwrap();
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].revision_range(), 4..=5);

    let all = log.get_stream(&key("S1"), 1, u64::MAX).unwrap();
    let events: usize = all.iter().map(|c| c.event_count()).sum();
    assert_eq!(events, 6);
}

#[test]
fn malformed_attempts_are_rejected_before_storage() {
    let log = sync_log();
    let empty = CommitAttempt::new(key("S1"), 1, 1, vec![]);
    assert!(matches!(log.commit(empty), Err(Error::InvalidCommit(_))));

    let gap = attempt(&log, "S1", 1, 2);
    assert!(matches!(log.commit(gap), Err(Error::InvalidCommit(_))));

    assert!(log.get_from(CheckpointToken::ZERO).unwrap().is_empty());
}

proptest::proptest! {
    #![proptest_config(proptest::prelude::ProptestConfig::with_cases(32))]

    #[test]
    fn interleaved_streams_read_back_in_token_order(
        lengths in proptest::collection::vec(1u64..8, 1..6),
    ) {
        let log = sync_log();
        let longest = lengths.iter().copied().max().unwrap_or(0);
        for seq in 1..=longest {
            for (i, len) in lengths.iter().enumerate() {
                if seq <= *len {
                    log.commit(attempt(&log, &format!("S{}", i), seq, seq)).unwrap();
                }
            }
        }

        let total: u64 = lengths.iter().sum();
        let tokens: Vec<u64> = log
            .get_from(CheckpointToken::ZERO)
            .unwrap()
            .iter()
            .map(|c| c.checkpoint_token.as_u64())
            .collect();
        proptest::prop_assert_eq!(tokens, (1..=total).collect::<Vec<_>>());

        for (i, len) in lengths.iter().enumerate() {
            let commits = log.get_stream(&key(&format!("S{}", i)), 1, u64::MAX).unwrap();
            let sequences: Vec<u64> = commits.iter().map(|c| c.commit_sequence).collect();
            proptest::prop_assert_eq!(sequences, (1..=*len).collect::<Vec<_>>());
        }
    }
}
