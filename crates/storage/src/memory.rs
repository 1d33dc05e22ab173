//! In-memory storage backend
//!
//! # Design
//!
//! - `commits`: DashMap keyed by checkpoint token. Claiming a vacant entry is
//!   the global uniqueness check on tokens.
//! - `streams`: DashMap keyed by stream. Holding a stream's entry is the
//!   per-stream uniqueness check on commit id, sequence and revision range.
//! - Different streams land in different shards and never contend, except
//!   for the brief checkpoint-entry claim.
//!
//! Lock order is always `streams` entry, then `commits` entry. Readers that
//! need both follow the same order.
//!
//! Token-ordered reads collect and sort. They are not on the append hot path.

use crate::backend::StorageBackend;
use crate::error::{DuplicateKey, StorageError, StorageResult};
use chronolog_core::{CheckpointToken, Commit, CommitId, Snapshot, StreamHead, StreamKey};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Position of one commit inside its stream
#[derive(Debug, Clone, Copy)]
struct IndexEntry {
    sequence: u64,
    first_revision: u64,
    last_revision: u64,
    checkpoint: CheckpointToken,
}

/// Per-stream index, ordered by commit sequence
#[derive(Debug, Default)]
struct StreamIndex {
    entries: Vec<IndexEntry>,
    commit_ids: FxHashSet<CommitId>,
}

impl StreamIndex {
    fn last(&self) -> Option<&IndexEntry> {
        self.entries.last()
    }

    /// Uniqueness and continuity checks for a new commit
    fn check(&self, commit: &Commit) -> StorageResult<()> {
        let range = commit
            .checked_revision_range()
            .ok_or_else(|| StorageError::Malformed {
                key: commit.key.clone(),
                reason: format!(
                    "revision {} cannot hold {} events",
                    commit.stream_revision,
                    commit.events.len()
                ),
            })?;
        if commit.commit_sequence == 0 {
            return Err(StorageError::Malformed {
                key: commit.key.clone(),
                reason: "commit sequence must start at 1".into(),
            });
        }

        if self.commit_ids.contains(&commit.commit_id) {
            return Err(StorageError::Duplicate(DuplicateKey::CommitId {
                key: commit.key.clone(),
                commit_id: commit.commit_id,
            }));
        }

        let (last_sequence, last_revision) = self
            .last()
            .map_or((0, 0), |e| (e.sequence, e.last_revision));

        if commit.commit_sequence <= last_sequence {
            return Err(StorageError::Duplicate(DuplicateKey::CommitSequence {
                key: commit.key.clone(),
                sequence: commit.commit_sequence,
            }));
        }
        if commit.commit_sequence != last_sequence + 1 {
            return Err(StorageError::SequenceGap {
                key: commit.key.clone(),
                expected: last_sequence + 1,
                actual: commit.commit_sequence,
            });
        }

        if *range.start() <= last_revision {
            return Err(StorageError::Duplicate(DuplicateKey::RevisionOverlap {
                key: commit.key.clone(),
                first: *range.start(),
                last: *range.end(),
            }));
        }
        Ok(())
    }

    fn push(&mut self, commit: &Commit) {
        let range = commit.revision_range();
        self.commit_ids.insert(commit.commit_id);
        self.entries.push(IndexEntry {
            sequence: commit.commit_sequence,
            first_revision: *range.start(),
            last_revision: *range.end(),
            checkpoint: commit.checkpoint_token,
        });
    }
}

/// DashMap-backed storage
///
/// # Thread Safety
///
/// All operations are thread-safe. Appends to different streams only share
/// the checkpoint map, where each claim locks a single shard.
///
/// # Example
///
/// ```ignore
/// use chronolog_storage::{InMemoryBackend, StorageBackend};
///
/// let backend = InMemoryBackend::new();
/// backend.insert_commit(&commit)?;
/// assert_eq!(backend.max_checkpoint()?, commit.checkpoint_token);
/// ```
#[derive(Default)]
pub struct InMemoryBackend {
    commits: DashMap<CheckpointToken, Commit>,
    streams: DashMap<StreamKey, StreamIndex>,
    heads: DashMap<StreamKey, StreamHead>,
    snapshots: DashMap<StreamKey, BTreeMap<u64, Snapshot>>,
    max_checkpoint: AtomicU64,
}

impl InMemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored commits
    pub fn commit_count(&self) -> usize {
        self.commits.len()
    }

    /// Number of streams with at least one stored commit
    pub fn stream_count(&self) -> usize {
        self.streams.iter().filter(|s| !s.entries.is_empty()).count()
    }

    // ========================================================================
    // Write paths with a persistence hook
    //
    // `persist` runs after every check passed and before the write becomes
    // visible. If it fails, nothing changes.
    // ========================================================================

    pub(crate) fn insert_commit_with(
        &self,
        commit: &Commit,
        persist: impl FnOnce(&Commit) -> StorageResult<()>,
    ) -> StorageResult<()> {
        let mut stream = self.streams.entry(commit.key.clone()).or_default();
        stream.check(commit)?;

        match self.commits.entry(commit.checkpoint_token) {
            Entry::Occupied(_) => {
                return Err(StorageError::Duplicate(DuplicateKey::Checkpoint {
                    token: commit.checkpoint_token,
                    key: commit.key.clone(),
                }))
            }
            Entry::Vacant(vacant) => {
                persist(commit)?;
                vacant.insert(commit.clone());
            }
        }

        stream.push(commit);
        self.max_checkpoint
            .fetch_max(commit.checkpoint_token.as_u64(), Ordering::AcqRel);
        Ok(())
    }

    pub(crate) fn update_stream_head_with(
        &self,
        key: &StreamKey,
        update: &dyn Fn(&mut StreamHead),
        persist: impl FnOnce(&StreamHead) -> StorageResult<()>,
    ) -> StorageResult<StreamHead> {
        let mut entry = self
            .heads
            .entry(key.clone())
            .or_insert_with(|| StreamHead::new(key.clone()));
        let mut head = entry.clone();
        update(&mut head);
        if head != *entry {
            persist(&head)?;
            *entry = head.clone();
        }
        Ok(head)
    }

    pub(crate) fn insert_snapshot_with(
        &self,
        snapshot: &Snapshot,
        persist: impl FnOnce(&Snapshot) -> StorageResult<()>,
    ) -> StorageResult<()> {
        let mut by_revision = self.snapshots.entry(snapshot.key.clone()).or_default();
        if by_revision.contains_key(&snapshot.stream_revision) {
            return Err(StorageError::Duplicate(DuplicateKey::SnapshotRevision {
                key: snapshot.key.clone(),
                revision: snapshot.stream_revision,
            }));
        }
        persist(snapshot)?;
        by_revision.insert(snapshot.stream_revision, snapshot.clone());
        Ok(())
    }

    /// Put a head back exactly as it was recorded (log replay)
    pub(crate) fn restore_head(&self, head: StreamHead) {
        self.heads.insert(head.key.clone(), head);
    }

    fn sorted(mut commits: Vec<Commit>) -> Vec<Commit> {
        commits.sort_by_key(|c| c.checkpoint_token);
        commits
    }

    fn bucket_keys(&self, bucket_id: &str) -> Vec<StreamKey> {
        let mut keys: FxHashSet<StreamKey> = self
            .streams
            .iter()
            .filter(|e| e.key().in_bucket(bucket_id))
            .map(|e| e.key().clone())
            .collect();
        keys.extend(
            self.heads
                .iter()
                .filter(|e| e.key().in_bucket(bucket_id))
                .map(|e| e.key().clone()),
        );
        keys.extend(
            self.snapshots
                .iter()
                .filter(|e| e.key().in_bucket(bucket_id))
                .map(|e| e.key().clone()),
        );
        keys.into_iter().collect()
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("commits", &self.commits.len())
            .field("streams", &self.streams.len())
            .field("max_checkpoint", &self.max_checkpoint.load(Ordering::Acquire))
            .finish()
    }
}

impl StorageBackend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn insert_commit(&self, commit: &Commit) -> StorageResult<()> {
        self.insert_commit_with(commit, |_| Ok(()))
    }

    fn max_checkpoint(&self) -> StorageResult<CheckpointToken> {
        Ok(CheckpointToken::new(
            self.max_checkpoint.load(Ordering::Acquire),
        ))
    }

    fn commits_from(&self, after: CheckpointToken, limit: usize) -> StorageResult<Vec<Commit>> {
        let mut commits = Self::sorted(
            self.commits
                .iter()
                .filter(|e| *e.key() > after)
                .map(|e| e.value().clone())
                .collect(),
        );
        commits.truncate(limit);
        Ok(commits)
    }

    fn commits_in_range(
        &self,
        from: CheckpointToken,
        to: CheckpointToken,
    ) -> StorageResult<Vec<Commit>> {
        Ok(Self::sorted(
            self.commits
                .iter()
                .filter(|e| *e.key() >= from && *e.key() <= to)
                .map(|e| e.value().clone())
                .collect(),
        ))
    }

    fn stream_commits(
        &self,
        key: &StreamKey,
        min_revision: u64,
        max_revision: u64,
    ) -> StorageResult<Vec<Commit>> {
        let checkpoints: Vec<CheckpointToken> = match self.streams.get(key) {
            Some(stream) => stream
                .entries
                .iter()
                .filter(|e| e.last_revision >= min_revision && e.first_revision <= max_revision)
                .map(|e| e.checkpoint)
                .collect(),
            None => return Ok(Vec::new()),
        };
        Ok(checkpoints
            .into_iter()
            .filter_map(|token| self.commits.get(&token).map(|c| c.value().clone()))
            .collect())
    }

    fn latest_commit(&self, key: &StreamKey) -> StorageResult<Option<Commit>> {
        let checkpoint = self
            .streams
            .get(key)
            .and_then(|stream| stream.last().map(|e| e.checkpoint));
        Ok(checkpoint.and_then(|token| self.commits.get(&token).map(|c| c.value().clone())))
    }

    fn commit_by_id(&self, key: &StreamKey, commit_id: &CommitId) -> StorageResult<Option<Commit>> {
        let checkpoints: Vec<CheckpointToken> = match self.streams.get(key) {
            Some(stream) if stream.commit_ids.contains(commit_id) => {
                stream.entries.iter().map(|e| e.checkpoint).collect()
            }
            _ => return Ok(None),
        };
        Ok(checkpoints.into_iter().find_map(|token| {
            self.commits
                .get(&token)
                .filter(|c| c.commit_id == *commit_id)
                .map(|c| c.value().clone())
        }))
    }

    fn update_stream_head(
        &self,
        key: &StreamKey,
        update: &dyn Fn(&mut StreamHead),
    ) -> StorageResult<StreamHead> {
        self.update_stream_head_with(key, update, |_| Ok(()))
    }

    fn stream_head(&self, key: &StreamKey) -> StorageResult<Option<StreamHead>> {
        Ok(self.heads.get(key).map(|h| h.value().clone()))
    }

    fn heads_needing_snapshot(
        &self,
        bucket_id: &str,
        threshold: u64,
        after: Option<&StreamKey>,
        limit: usize,
    ) -> StorageResult<Vec<StreamHead>> {
        let mut heads: Vec<StreamHead> = self
            .heads
            .iter()
            .filter(|e| e.key().in_bucket(bucket_id))
            .filter(|e| after.map_or(true, |cursor| e.key() > cursor))
            .filter(|e| e.value().needs_snapshot(threshold))
            .map(|e| e.value().clone())
            .collect();
        heads.sort_by(|a, b| a.key.cmp(&b.key));
        heads.truncate(limit);
        Ok(heads)
    }

    fn insert_snapshot(&self, snapshot: &Snapshot) -> StorageResult<()> {
        self.insert_snapshot_with(snapshot, |_| Ok(()))
    }

    fn latest_snapshot(
        &self,
        key: &StreamKey,
        max_revision: u64,
    ) -> StorageResult<Option<Snapshot>> {
        Ok(self.snapshots.get(key).and_then(|by_revision| {
            by_revision
                .range(..=max_revision)
                .next_back()
                .map(|(_, s)| s.clone())
        }))
    }

    fn delete_stream(&self, key: &StreamKey) -> StorageResult<()> {
        if let Some((_, stream)) = self.streams.remove(key) {
            for entry in stream.entries {
                self.commits.remove(&entry.checkpoint);
            }
        }
        self.heads.remove(key);
        self.snapshots.remove(key);
        Ok(())
    }

    fn purge_bucket(&self, bucket_id: &str) -> StorageResult<()> {
        for key in self.bucket_keys(bucket_id) {
            self.delete_stream(&key)?;
        }
        Ok(())
    }

    fn purge(&self) -> StorageResult<()> {
        self.streams.clear();
        self.commits.clear();
        self.heads.clear();
        self.snapshots.clear();
        Ok(())
    }
}
