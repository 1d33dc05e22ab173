//! Checkpoint token generators
//!
//! A generator hands out tokens strictly greater than every token it handed
//! out before and every token already stored. Tokens survive restart because
//! both implementations seed from the backend's high-water mark, which the
//! backend never lowers (not even on purge).
//!
//! Allocating a token does not reserve it. The backend's uniqueness check on
//! checkpoint tokens decides which writer wins; the loser calls
//! [`CheckpointGenerator::on_collision`] and consults the
//! [`ConcurrencyStrategy`](crate::ConcurrencyStrategy).

use chronolog_core::{CheckpointToken, Error, Result};
use chronolog_storage::StorageBackend;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Produces strictly increasing checkpoint tokens
pub trait CheckpointGenerator: Send + Sync {
    /// Allocate the next token
    ///
    /// # Errors
    ///
    /// `Error::StorageUnavailable` when the backing counter cannot be read.
    fn next(&self) -> Result<CheckpointToken>;

    /// Called after `failed` lost an insertion race
    ///
    /// Generators that cache state use this to catch up with the store.
    fn on_collision(&self, failed: CheckpointToken) -> Result<()> {
        let _ = failed;
        Ok(())
    }
}

/// Process-local counter seeded from the store
///
/// Allocation is a single atomic increment. Writers in the same process
/// never collide; a collision means another process wrote to the same
/// store, and the counter jumps past everything stored.
pub struct InMemoryCheckpointGenerator {
    backend: Arc<dyn StorageBackend>,
    last: AtomicU64,
}

impl InMemoryCheckpointGenerator {
    /// Create a generator starting after the backend's highest token
    pub fn new(backend: Arc<dyn StorageBackend>) -> Result<Self> {
        let seed = backend.max_checkpoint()?;
        debug!(backend = backend.name(), %seed, "checkpoint generator seeded");
        Ok(Self {
            backend,
            last: AtomicU64::new(seed.as_u64()),
        })
    }

    /// Last token handed out (or the seed)
    pub fn last(&self) -> CheckpointToken {
        CheckpointToken::new(self.last.load(Ordering::Acquire))
    }
}

impl CheckpointGenerator for InMemoryCheckpointGenerator {
    fn next(&self) -> Result<CheckpointToken> {
        self.last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| v.checked_add(1))
            .map(|previous| CheckpointToken::new(previous + 1))
            .map_err(|_| Error::StorageUnavailable("checkpoint space exhausted".into()))
    }

    fn on_collision(&self, failed: CheckpointToken) -> Result<()> {
        let stored = self.backend.max_checkpoint()?;
        let floor = stored.max(failed).as_u64();
        self.last.fetch_max(floor, Ordering::AcqRel);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryCheckpointGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCheckpointGenerator")
            .field("backend", &self.backend.name())
            .field("last", &self.last.load(Ordering::Acquire))
            .finish()
    }
}

/// Asks the store on every allocation (`max + 1`)
///
/// Holds no state, so any number of instances in any number of processes
/// agree. Concurrent writers routinely compute the same candidate and all
/// but one of them collide.
pub struct StorageCheckpointGenerator {
    backend: Arc<dyn StorageBackend>,
}

impl StorageCheckpointGenerator {
    /// Create a generator over `backend`
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }
}

impl CheckpointGenerator for StorageCheckpointGenerator {
    fn next(&self) -> Result<CheckpointToken> {
        let max = self.backend.max_checkpoint()?;
        if max.as_u64() == u64::MAX {
            return Err(Error::StorageUnavailable("checkpoint space exhausted".into()));
        }
        Ok(max.next())
    }
}

impl std::fmt::Debug for StorageCheckpointGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageCheckpointGenerator")
            .field("backend", &self.backend.name())
            .finish()
    }
}
