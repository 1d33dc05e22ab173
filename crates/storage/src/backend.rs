//! Storage backend contract
//!
//! Everything above this trait (checkpoint generation, conflict resolution,
//! head tracking) relies only on what is written here. In particular, per
//! stream ordering is enforced by `insert_commit`'s atomic uniqueness check,
//! never by a lock held in the caller's process.

use crate::error::StorageResult;
use chronolog_core::{CheckpointToken, Commit, CommitId, Snapshot, StreamHead, StreamKey};

/// Storage backend used by the commit log
///
/// Implementations must be safe to share across threads. Commits to distinct
/// streams must not serialize on a common lock.
pub trait StorageBackend: Send + Sync {
    /// Short backend name, used in logs
    fn name(&self) -> &'static str;

    // ========================================================================
    // Commits
    // ========================================================================

    /// Atomically insert a commit
    ///
    /// Rejects with `StorageError::Duplicate` when the checkpoint token, the
    /// commit id, the commit sequence or any revision of the batch is already
    /// stored. Rejects with `StorageError::SequenceGap` when the sequence is
    /// not the stream's next one.
    fn insert_commit(&self, commit: &Commit) -> StorageResult<()>;

    /// Highest checkpoint token ever stored ([`CheckpointToken::ZERO`] if none)
    fn max_checkpoint(&self) -> StorageResult<CheckpointToken>;

    /// Commits with a token strictly greater than `after`, in token order
    fn commits_from(&self, after: CheckpointToken, limit: usize) -> StorageResult<Vec<Commit>>;

    /// Commits with `from <= token <= to`, in token order
    fn commits_in_range(
        &self,
        from: CheckpointToken,
        to: CheckpointToken,
    ) -> StorageResult<Vec<Commit>>;

    /// Commits of one stream touching `min_revision..=max_revision`, in sequence order
    fn stream_commits(
        &self,
        key: &StreamKey,
        min_revision: u64,
        max_revision: u64,
    ) -> StorageResult<Vec<Commit>>;

    /// Most recent commit of a stream
    fn latest_commit(&self, key: &StreamKey) -> StorageResult<Option<Commit>>;

    /// Stored commit with the given id
    fn commit_by_id(&self, key: &StreamKey, commit_id: &CommitId) -> StorageResult<Option<Commit>>;

    // ========================================================================
    // Stream heads
    // ========================================================================

    /// Apply `update` to the stream's head atomically and return the result
    ///
    /// A missing head starts from [`StreamHead::new`].
    fn update_stream_head(
        &self,
        key: &StreamKey,
        update: &dyn Fn(&mut StreamHead),
    ) -> StorageResult<StreamHead>;

    /// Current head of a stream
    fn stream_head(&self, key: &StreamKey) -> StorageResult<Option<StreamHead>>;

    /// Heads in `bucket_id` with `unsnapshotted >= threshold`, ordered by key,
    /// starting strictly after `after`
    fn heads_needing_snapshot(
        &self,
        bucket_id: &str,
        threshold: u64,
        after: Option<&StreamKey>,
        limit: usize,
    ) -> StorageResult<Vec<StreamHead>>;

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Insert a snapshot; an existing snapshot at the same revision is a duplicate
    fn insert_snapshot(&self, snapshot: &Snapshot) -> StorageResult<()>;

    /// Latest snapshot with `stream_revision <= max_revision`
    fn latest_snapshot(&self, key: &StreamKey, max_revision: u64)
        -> StorageResult<Option<Snapshot>>;

    // ========================================================================
    // Deletion
    // ========================================================================

    /// Remove a stream with its commits, head and snapshots
    fn delete_stream(&self, key: &StreamKey) -> StorageResult<()>;

    /// Remove every stream of a bucket
    fn purge_bucket(&self, bucket_id: &str) -> StorageResult<()>;

    /// Remove everything
    ///
    /// The checkpoint high-water mark survives, so tokens are never reissued.
    fn purge(&self) -> StorageResult<()>;
}
