//! Snapshot store
//!
//! Snapshots are immutable. Saving at a revision that already has a
//! snapshot keeps the stored one and reports `false`; later snapshots
//! supersede earlier ones without touching them.
//!
//! The payload is stored exactly as given, type tag included, so a load
//! hands back the same [`Payload`](chronolog_core::Payload) that was saved.

use crate::heads::StreamHeadTracker;
use chronolog_core::{Result, Snapshot, StreamKey};
use chronolog_storage::{DuplicateKey, StorageBackend, StorageError};
use std::sync::Arc;
use tracing::{debug, error};

/// Saves and loads snapshots
pub struct SnapshotStore {
    backend: Arc<dyn StorageBackend>,
    heads: Arc<StreamHeadTracker>,
}

impl SnapshotStore {
    /// Create a store that reports saved snapshots to `heads`
    pub fn new(backend: Arc<dyn StorageBackend>, heads: Arc<StreamHeadTracker>) -> Self {
        Self { backend, heads }
    }

    /// Persist a new snapshot
    ///
    /// Returns `false` if a snapshot already exists at that revision.
    pub fn save(&self, snapshot: &Snapshot) -> Result<bool> {
        match self.backend.insert_snapshot(snapshot) {
            Ok(()) => {}
            Err(StorageError::Duplicate(DuplicateKey::SnapshotRevision { key, revision })) => {
                debug!(stream = %key, revision, "snapshot already stored");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = self
            .heads
            .record_snapshot(&snapshot.key, snapshot.stream_revision)
        {
            error!(
                stream = %snapshot.key,
                revision = snapshot.stream_revision,
                error = %e,
                "snapshot saved but stream head not updated"
            );
        }
        debug!(stream = %snapshot.key, revision = snapshot.stream_revision, "snapshot saved");
        Ok(true)
    }

    /// Latest snapshot at or below `max_revision`
    pub fn load(&self, key: &StreamKey, max_revision: u64) -> Result<Option<Snapshot>> {
        Ok(self.backend.latest_snapshot(key, max_revision)?)
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("backend", &self.backend.name())
            .finish()
    }
}
