//! Persistence engine
//!
//! Wires the commit writer, the head tracker and the snapshot store over
//! one storage backend, and exposes the read side of the log.

use crate::config::PersistenceOptions;
use crate::heads::{StreamHeadTracker, StreamsNeedingSnapshot};
use crate::snapshots::SnapshotStore;
use crate::worker::HeadWorkerStats;
use crate::writer::CommitWriter;
use chronolog_concurrency::{CheckpointGenerator, InMemoryCheckpointGenerator};
use chronolog_core::{
    CheckpointToken, Commit, CommitAttempt, Payload, PayloadType, Result, Snapshot, StreamHead,
    StreamKey,
};
use chronolog_storage::StorageBackend;
use std::sync::Arc;
use tracing::info;

/// Commit log over a storage backend
///
/// # Thread Safety
///
/// `PersistenceEngine` is `Send + Sync`; share it behind an `Arc`.
pub struct PersistenceEngine {
    options: PersistenceOptions,
    backend: Arc<dyn StorageBackend>,
    writer: CommitWriter,
    heads: Arc<StreamHeadTracker>,
    snapshots: SnapshotStore,
}

impl PersistenceEngine {
    /// Build an engine with a process-local checkpoint generator
    ///
    /// # Errors
    ///
    /// `Error::Configuration` if `options` do not validate.
    pub fn new(backend: Arc<dyn StorageBackend>, options: PersistenceOptions) -> Result<Self> {
        options.validate()?;
        let generator = Arc::new(InMemoryCheckpointGenerator::new(Arc::clone(&backend))?);
        Self::with_generator(backend, generator, options)
    }

    /// Build an engine with a caller-supplied checkpoint generator
    pub fn with_generator(
        backend: Arc<dyn StorageBackend>,
        generator: Arc<dyn CheckpointGenerator>,
        options: PersistenceOptions,
    ) -> Result<Self> {
        options.validate()?;
        let heads = Arc::new(StreamHeadTracker::new(
            Arc::clone(&backend),
            options.head_tracking,
            options.head_queue_capacity,
        )?);
        let writer = CommitWriter::new(
            Arc::clone(&backend),
            generator,
            Arc::clone(&heads),
            options.concurrency_strategy,
            options.retry_budget()?,
            options.system_bucket.clone(),
        );
        let snapshots = SnapshotStore::new(Arc::clone(&backend), Arc::clone(&heads));

        info!(
            backend = backend.name(),
            strategy = %options.concurrency_strategy,
            head_tracking = ?options.head_tracking,
            serializer = ?options.serializer,
            "persistence engine ready"
        );
        Ok(Self {
            options,
            backend,
            writer,
            heads,
            snapshots,
        })
    }

    /// Options the engine was built with
    pub fn options(&self) -> &PersistenceOptions {
        &self.options
    }

    /// Underlying backend
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    // ========================================================================
    // Commits
    // ========================================================================

    /// Append a commit
    pub fn commit(&self, attempt: CommitAttempt) -> Result<Commit> {
        self.writer.append(attempt)
    }

    /// Every commit after `after`, in checkpoint order
    ///
    /// Placeholders are included; check [`Commit::is_placeholder`].
    pub fn get_from(&self, after: CheckpointToken) -> Result<Vec<Commit>> {
        Ok(self.backend.commits_from(after, usize::MAX)?)
    }

    /// At most `limit` commits after `after`, in checkpoint order
    pub fn get_page(&self, after: CheckpointToken, limit: usize) -> Result<Vec<Commit>> {
        Ok(self.backend.commits_from(after, limit)?)
    }

    /// Commits with `from <= checkpoint <= to`
    pub fn get_range(&self, from: CheckpointToken, to: CheckpointToken) -> Result<Vec<Commit>> {
        Ok(self.backend.commits_in_range(from, to)?)
    }

    /// Commits of a stream touching `min_revision..=max_revision`
    pub fn get_stream(
        &self,
        key: &StreamKey,
        min_revision: u64,
        max_revision: u64,
    ) -> Result<Vec<Commit>> {
        Ok(self
            .backend
            .stream_commits(key, min_revision, max_revision)?)
    }

    /// Highest checkpoint stored so far
    pub fn last_checkpoint(&self) -> Result<CheckpointToken> {
        Ok(self.backend.max_checkpoint()?)
    }

    // ========================================================================
    // Heads and snapshots
    // ========================================================================

    /// Stored head of a stream
    pub fn stream_head(&self, key: &StreamKey) -> Result<Option<StreamHead>> {
        self.heads.head(key)
    }

    /// Save a snapshot; `false` if one already exists at that revision
    pub fn add_snapshot(&self, snapshot: &Snapshot) -> Result<bool> {
        self.snapshots.save(snapshot)
    }

    /// Latest snapshot at or below `max_revision`
    pub fn get_snapshot(&self, key: &StreamKey, max_revision: u64) -> Result<Option<Snapshot>> {
        self.snapshots.load(key, max_revision)
    }

    /// Streams of `bucket_id` with at least `threshold` unsnapshotted events
    pub fn streams_to_snapshot(&self, bucket_id: &str, threshold: u64) -> StreamsNeedingSnapshot {
        self.heads.streams_needing_snapshot(bucket_id, threshold)
    }

    /// Wait for background head updates to land
    pub fn flush_heads(&self) {
        self.heads.flush();
    }

    /// Background head worker counters
    pub fn head_worker_stats(&self) -> HeadWorkerStats {
        self.heads.worker_stats()
    }

    // ========================================================================
    // Payloads
    // ========================================================================

    /// Encode a typed value with the configured serializer
    pub fn encode<T: PayloadType>(&self, value: &T) -> Result<Payload> {
        Payload::encode(value, &self.options.serializer)
    }

    /// Decode a payload with the configured serializer
    pub fn decode<T: PayloadType>(&self, payload: &Payload) -> Result<T> {
        payload.decode(&self.options.serializer)
    }

    // ========================================================================
    // Deletion
    // ========================================================================

    /// Remove a stream with its commits, head and snapshots
    pub fn delete_stream(&self, key: &StreamKey) -> Result<()> {
        // a queued head update must not recreate the head afterwards
        self.heads.flush();
        self.backend.delete_stream(key)?;
        info!(stream = %key, "stream deleted");
        Ok(())
    }

    /// Remove every stream of a bucket
    pub fn purge_bucket(&self, bucket_id: &str) -> Result<()> {
        self.heads.flush();
        self.backend.purge_bucket(bucket_id)?;
        info!(bucket = bucket_id, "bucket purged");
        Ok(())
    }

    /// Remove everything; checkpoint tokens keep counting from where they were
    pub fn purge(&self) -> Result<()> {
        self.heads.flush();
        self.backend.purge()?;
        info!("store purged");
        Ok(())
    }
}

impl std::fmt::Debug for PersistenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceEngine")
            .field("options", &self.options)
            .field("writer", &self.writer)
            .field("heads", &self.heads)
            .finish()
    }
}
