//! Stream head: derived per-stream summary
//!
//! A head records the highest committed revision of a stream and how many
//! events were committed since the last snapshot. It is bookkeeping, not
//! truth: the commits are authoritative and a head may lag behind them.
//!
//! Both mutations only move forward, so re-applying an update that already
//! landed is a no-op. This is what makes at-least-once delivery of head
//! updates safe.

use crate::types::StreamKey;
use serde::{Deserialize, Serialize};

/// Summary of one stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamHead {
    /// Stream identity
    pub key: StreamKey,
    /// Highest committed revision
    pub head_revision: u64,
    /// Revision of the most recent snapshot, if any
    pub snapshot_revision: Option<u64>,
    /// Events committed since `snapshot_revision`
    pub unsnapshotted: u64,
}

impl StreamHead {
    /// Empty head for a stream with no commits yet
    pub fn new(key: StreamKey) -> Self {
        Self {
            key,
            head_revision: 0,
            snapshot_revision: None,
            unsnapshotted: 0,
        }
    }

    /// Advance to a newly committed revision
    ///
    /// Revisions at or below the current head are ignored.
    pub fn apply_commit(&mut self, revision: u64) {
        if revision > self.head_revision {
            self.head_revision = revision;
        }
        self.recount();
    }

    /// Record a snapshot taken at `revision`
    ///
    /// Older snapshots never move the snapshot revision backwards.
    pub fn apply_snapshot(&mut self, revision: u64) {
        if self.snapshot_revision.map_or(true, |current| revision > current) {
            self.snapshot_revision = Some(revision);
        }
        self.recount();
    }

    /// Whether enough events accumulated to warrant a snapshot
    pub fn needs_snapshot(&self, threshold: u64) -> bool {
        self.unsnapshotted >= threshold
    }

    fn recount(&mut self) {
        self.unsnapshotted = self
            .head_revision
            .saturating_sub(self.snapshot_revision.unwrap_or(0));
    }
}
