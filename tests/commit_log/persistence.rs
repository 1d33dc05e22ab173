//! Durability Tests
//!
//! A log reopened from its directory holds exactly what was committed.

use crate::common::*;
use chronolog::prelude::*;
use chronolog::LOG_FILE_NAME;
use tempfile::TempDir;

fn open_sync(dir: &TempDir) -> Chronolog {
    init_tracing();
    Chronolog::builder()
        .path(dir.path())
        .head_tracking(HeadTracking::Synchronous)
        .open()
        .unwrap()
}

#[test]
fn reopen_restores_commits_heads_and_snapshots() {
    let dir = TempDir::new().unwrap();
    let (written, snapshot) = {
        let log = open_sync(&dir);
        assert!(!log.is_ephemeral());
        log.commit(batch(&log, "S1", 2, 1, 2)).unwrap();
        log.commit(attempt(&log, "S2", 1, 1)).unwrap();
        log.commit(attempt(&log, "S1", 3, 2)).unwrap();
        let payload = log.encode(&SimpleMessage::new("state")).unwrap();
        let snapshot = Snapshot::new(key("S1"), 2, payload);
        log.add_snapshot(&snapshot).unwrap();
        let written = log.get_from(CheckpointToken::ZERO).unwrap();
        log.close();
        (written, snapshot)
    };
    assert!(dir.path().join(LOG_FILE_NAME).exists());

    let log = open_sync(&dir);
    assert_eq!(log.get_from(CheckpointToken::ZERO).unwrap(), written);
    assert_eq!(log.get_snapshot(&key("S1"), 3).unwrap(), Some(snapshot));

    let head = log.stream_head(&key("S1")).unwrap().unwrap();
    assert_eq!(head.head_revision, 3);
    assert_eq!(head.snapshot_revision, Some(2));
    assert_eq!(head.unsnapshotted, 1);
}

#[test]
fn tokens_continue_after_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let log = open_sync(&dir);
        for rev in 1..=5 {
            log.commit(attempt(&log, "S1", rev, rev)).unwrap();
        }
    }

    let log = open_sync(&dir);
    assert_eq!(log.last_checkpoint().unwrap(), CheckpointToken::new(5));
    let next = log.commit(attempt(&log, "S1", 6, 6)).unwrap();
    assert_eq!(next.checkpoint_token, CheckpointToken::new(6));

    // the stream rules survive too
    let err = log.commit(attempt(&log, "S1", 7, 6)).unwrap_err();
    assert_eq!(err.conflict_kind(), Some(ConflictKind::CommitSequence));
}

#[test]
fn deleted_stream_stays_deleted() {
    let dir = TempDir::new().unwrap();
    {
        let log = open_sync(&dir);
        log.commit(attempt(&log, "S1", 1, 1)).unwrap();
        log.commit(attempt(&log, "S2", 1, 1)).unwrap();
        log.delete_stream(&key("S1")).unwrap();
    }

    let log = open_sync(&dir);
    assert!(log.get_stream(&key("S1"), 0, u64::MAX).unwrap().is_empty());
    assert!(log.stream_head(&key("S1")).unwrap().is_none());
    assert_eq!(log.get_stream(&key("S2"), 0, u64::MAX).unwrap().len(), 1);

    // the token of the deleted commit is never handed out again
    let commit = log.commit(attempt(&log, "S1", 1, 1)).unwrap();
    assert_eq!(commit.checkpoint_token, CheckpointToken::new(3));
}

#[test]
fn purge_survives_reopen_without_reusing_tokens() {
    let dir = TempDir::new().unwrap();
    {
        let log = open_sync(&dir);
        for stream in ["S1", "S2", "S3"] {
            log.commit(attempt(&log, stream, 1, 1)).unwrap();
        }
        log.purge().unwrap();
    }

    let log = open_sync(&dir);
    assert!(log.get_from(CheckpointToken::ZERO).unwrap().is_empty());
    let commit = log.commit(attempt(&log, "S1", 1, 1)).unwrap();
    assert_eq!(commit.checkpoint_token, CheckpointToken::new(4));
}

#[test]
fn options_file_configures_the_log() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("chronolog.toml");
    std::fs::write(
        &config,
        r#"
concurrency_strategy = "fillhole"
head_tracking = "synchronous"
system_bucket = "internal"
max_checkpoint_attempts = 8
serializer = "json"
"#,
    )
    .unwrap();

    let log = Chronolog::builder()
        .options_file(&config)
        .unwrap()
        .path(dir.path().join("data"))
        .no_sync()
        .open()
        .unwrap();

    let options = log.options();
    assert_eq!(options.concurrency_strategy, ConcurrencyStrategy::FillHole);
    assert_eq!(options.head_tracking, HeadTracking::Synchronous);
    assert_eq!(options.system_bucket, "internal");
    assert_eq!(options.max_checkpoint_attempts, 8);
    assert_eq!(options.serializer, SerializerKind::Json);

    log.commit(attempt(&log, "S1", 1, 1)).unwrap();
    assert!(log.stream_head(&key("S1")).unwrap().is_some());
    assert!(dir.path().join("data").join(LOG_FILE_NAME).exists());
}

#[test]
fn bad_options_file_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("chronolog.toml");
    std::fs::write(&config, "max_checkpoint_attempts = 0\n").unwrap();

    let err = Chronolog::builder().options_file(&config).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));

    let missing = Chronolog::builder()
        .options_file(dir.path().join("missing.toml"))
        .unwrap_err();
    assert!(matches!(missing, Error::Configuration(_)));
}
