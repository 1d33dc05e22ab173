//! Commit types
//!
//! A commit is an immutable batch of events appended atomically to one stream.
//! Callers build a [`CommitAttempt`]; the commit writer assigns a checkpoint
//! token and stores it as a [`Commit`].
//!
//! ## Per-stream invariants
//!
//! For a fixed stream key:
//! - `commit_sequence` values are contiguous, starting at 1
//! - revision ranges covered by successive commits never overlap
//!
//! Both are enforced by the storage backend's uniqueness check, never by an
//! in-process lock.

use crate::error::{Error, Result};
use crate::types::{CheckpointToken, CommitId, StreamKey};
use crate::value::{Payload, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// Commit and event headers
pub type Headers = BTreeMap<String, Value>;

/// A single event inside a commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    /// Event-level headers
    pub headers: Headers,
    /// Event body
    pub body: Payload,
}

impl EventMessage {
    /// Create an event with no headers
    pub fn new(body: Payload) -> Self {
        Self {
            headers: Headers::new(),
            body,
        }
    }

    /// Add a header, builder style
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// A commit that has not been stored yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitAttempt {
    /// Target stream
    pub key: StreamKey,
    /// Revision of the last event in this batch
    pub stream_revision: u64,
    /// Idempotency key
    pub commit_id: CommitId,
    /// Ordinal of this commit within the stream (starts at 1)
    pub commit_sequence: u64,
    /// When the client produced the commit
    pub commit_stamp: DateTime<Utc>,
    /// Commit-level headers
    pub headers: Headers,
    /// Ordered events
    pub events: Vec<EventMessage>,
}

impl CommitAttempt {
    /// Create an attempt with a fresh commit id and the current time
    pub fn new(
        key: StreamKey,
        stream_revision: u64,
        commit_sequence: u64,
        events: Vec<EventMessage>,
    ) -> Self {
        Self {
            key,
            stream_revision,
            commit_id: CommitId::new(),
            commit_sequence,
            commit_stamp: Utc::now(),
            headers: Headers::new(),
            events,
        }
    }

    /// Add a commit header, builder style
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Use a specific commit id, builder style
    pub fn with_commit_id(mut self, commit_id: CommitId) -> Self {
        self.commit_id = commit_id;
        self
    }

    /// Structural validation, run before any checkpoint is allocated
    ///
    /// Rejects empty identities, zero sequence/revision, empty batches and a
    /// revision too small to hold every event of the batch.
    pub fn validate(&self) -> Result<()> {
        if self.key.bucket_id.is_empty() {
            return Err(Error::InvalidCommit("bucket id is empty".into()));
        }
        if self.key.stream_id.is_empty() {
            return Err(Error::InvalidCommit("stream id is empty".into()));
        }
        if self.commit_sequence == 0 {
            return Err(Error::InvalidCommit("commit sequence must start at 1".into()));
        }
        if self.stream_revision == 0 {
            return Err(Error::InvalidCommit("stream revision must start at 1".into()));
        }
        if self.events.is_empty() {
            return Err(Error::InvalidCommit("commit has no events".into()));
        }
        if self.stream_revision < self.events.len() as u64 {
            return Err(Error::InvalidCommit(format!(
                "stream revision {} cannot hold {} events",
                self.stream_revision,
                self.events.len()
            )));
        }
        Ok(())
    }

    /// Stamp the attempt with its checkpoint token
    pub fn into_commit(self, checkpoint_token: CheckpointToken) -> Commit {
        Commit {
            key: self.key,
            stream_revision: self.stream_revision,
            commit_id: self.commit_id,
            commit_sequence: self.commit_sequence,
            commit_stamp: self.commit_stamp,
            checkpoint_token,
            headers: self.headers,
            events: self.events,
        }
    }
}

/// A stored commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    /// Stream the commit belongs to
    pub key: StreamKey,
    /// Revision of the last event in this commit
    pub stream_revision: u64,
    /// Idempotency key
    pub commit_id: CommitId,
    /// Ordinal of this commit within the stream
    pub commit_sequence: u64,
    /// When the client produced the commit
    pub commit_stamp: DateTime<Utc>,
    /// Global position, assigned at append time
    pub checkpoint_token: CheckpointToken,
    /// Commit-level headers
    pub headers: Headers,
    /// Ordered events
    pub events: Vec<EventMessage>,
}

impl Commit {
    /// Zero-event commit occupying a checkpoint token that lost a collision
    ///
    /// Each placeholder gets its own stream in the system bucket, so it can
    /// never collide with real streams or with another placeholder.
    pub fn placeholder(system_bucket: &str, checkpoint_token: CheckpointToken) -> Self {
        Self {
            key: StreamKey::new(system_bucket, format!("placeholder-{}", checkpoint_token)),
            stream_revision: 1,
            commit_id: CommitId::new(),
            commit_sequence: 1,
            commit_stamp: Utc::now(),
            checkpoint_token,
            headers: Headers::new(),
            events: Vec::new(),
        }
    }

    /// Whether this commit is a placeholder written by the FillHole policy
    pub fn is_placeholder(&self) -> bool {
        self.events.is_empty() && self.key.stream_id.starts_with("placeholder-")
    }

    /// Revisions covered by this commit
    ///
    /// Placeholders cover their single nominal revision. For a commit whose
    /// revision cannot hold its events the range is clamped at zero; use
    /// [`checked_revision_range`](Self::checked_revision_range) to detect it.
    pub fn revision_range(&self) -> RangeInclusive<u64> {
        let count = (self.events.len() as u64).max(1);
        self.stream_revision.saturating_sub(count - 1)..=self.stream_revision
    }

    /// Revisions covered by this commit, `None` unless they start at 1 or later
    pub fn checked_revision_range(&self) -> Option<RangeInclusive<u64>> {
        let count = (self.events.len() as u64).max(1);
        let first = self
            .stream_revision
            .checked_sub(count - 1)
            .filter(|first| *first >= 1)?;
        Some(first..=self.stream_revision)
    }

    /// Number of events in this commit
    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}
