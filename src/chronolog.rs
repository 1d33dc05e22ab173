//! Main entry point for chronolog.
//!
//! This module provides the `Chronolog` struct, which opens a storage backend
//! and builds a [`PersistenceEngine`] over it.

use chronolog_concurrency::ConcurrencyStrategy;
use chronolog_core::{Error, Result, SerializerKind};
use chronolog_engine::{HeadTracking, PersistenceEngine, PersistenceOptions};
use chronolog_storage::{FileBackend, FileBackendOptions, InMemoryBackend, StorageBackend};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Name of the commit log inside a data directory
pub const LOG_FILE_NAME: &str = "commits.log";

/// An open commit log.
///
/// Create one with [`Chronolog::open`], [`Chronolog::ephemeral`] or
/// [`Chronolog::builder`]. Every engine operation is reachable through
/// `Deref<Target = PersistenceEngine>`.
///
/// # Example
///
/// ```ignore
/// use chronolog::prelude::*;
///
/// let log = Chronolog::open("./data")?;
/// let commit = log.commit(CommitAttempt::new(
///     StreamKey::new("default", "account-1"),
///     1,
///     1,
///     vec![EventMessage::new(log.encode(&Deposited { amount: 10 })?)],
/// ))?;
/// log.close();
/// ```
pub struct Chronolog {
    engine: Arc<PersistenceEngine>,
    path: Option<PathBuf>,
}

impl Chronolog {
    /// Open (or create) a commit log in the given directory.
    ///
    /// Uses default options: `Continue` collisions, background head
    /// tracking, fsync on every write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::builder().path(path).open()
    }

    /// Create an in-memory commit log.
    ///
    /// No files are created and everything is lost on drop. Use this for
    /// tests and scratch work.
    pub fn ephemeral() -> Result<Self> {
        Self::builder().open()
    }

    /// Create a builder for commit log configuration.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let log = Chronolog::builder()
    ///     .path("./data")
    ///     .fill_holes()
    ///     .head_tracking(HeadTracking::Synchronous)
    ///     .open()?;
    /// ```
    pub fn builder() -> ChronologBuilder {
        ChronologBuilder::new()
    }

    /// Shared handle to the engine.
    pub fn engine(&self) -> &Arc<PersistenceEngine> {
        &self.engine
    }

    /// Data directory, `None` when ephemeral.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Check if this log lives only in memory.
    pub fn is_ephemeral(&self) -> bool {
        self.path.is_none()
    }

    /// Wait for pending head updates, then close.
    pub fn close(self) {
        self.engine.flush_heads();
        info!(path = ?self.path, "commit log closed");
    }
}

impl Deref for Chronolog {
    type Target = PersistenceEngine;

    fn deref(&self) -> &PersistenceEngine {
        &self.engine
    }
}

impl std::fmt::Debug for Chronolog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chronolog")
            .field("path", &self.path)
            .field("engine", &self.engine)
            .finish()
    }
}

/// Builder for commit log configuration.
///
/// # Example
///
/// ```ignore
/// // Durable, contiguous checkpoints
/// let log = Chronolog::builder()
///     .path("./data")
///     .fill_holes()
///     .open()?;
///
/// // Options from a TOML file
/// let log = Chronolog::builder()
///     .path("./data")
///     .options_file("./chronolog.toml")?
///     .open()?;
///
/// // Unit testing: in memory, heads written inline
/// let log = Chronolog::builder()
///     .head_tracking(HeadTracking::Synchronous)
///     .open()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChronologBuilder {
    path: Option<PathBuf>,
    options: PersistenceOptions,
    no_sync: bool,
}

impl ChronologBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the data directory. Without one the log is in memory.
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Replace all engine options.
    pub fn options(mut self, options: PersistenceOptions) -> Self {
        self.options = options;
        self
    }

    /// Load engine options from a TOML file.
    pub fn options_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.options = PersistenceOptions::from_toml_file(path)?;
        Ok(self)
    }

    /// Set the checkpoint collision policy.
    pub fn strategy(mut self, strategy: ConcurrencyStrategy) -> Self {
        self.options.concurrency_strategy = strategy;
        self
    }

    /// Use [`ConcurrencyStrategy::FillHole`].
    pub fn fill_holes(self) -> Self {
        self.strategy(ConcurrencyStrategy::FillHole)
    }

    /// Set the stream head maintenance mode.
    pub fn head_tracking(mut self, mode: HeadTracking) -> Self {
        self.options.head_tracking = mode;
        self
    }

    /// Set the bucket that holds placeholder commits.
    pub fn system_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.options.system_bucket = bucket.into();
        self
    }

    /// Set the checkpoint retry bound.
    pub fn max_checkpoint_attempts(mut self, attempts: u32) -> Self {
        self.options.max_checkpoint_attempts = attempts;
        self
    }

    /// Set the payload serializer.
    pub fn serializer(mut self, serializer: SerializerKind) -> Self {
        self.options.serializer = serializer;
        self
    }

    /// Skip fsync after each log write.
    ///
    /// Writes survive a process crash but not a power loss.
    pub fn no_sync(mut self) -> Self {
        self.no_sync = true;
        self
    }

    /// Open the commit log.
    pub fn open(self) -> Result<Chronolog> {
        self.options.validate()?;

        let backend: Arc<dyn StorageBackend> = match &self.path {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|e| {
                    Error::StorageUnavailable(format!("cannot create {}: {}", dir.display(), e))
                })?;
                let options = FileBackendOptions {
                    sync_on_write: !self.no_sync,
                };
                Arc::new(FileBackend::open(dir.join(LOG_FILE_NAME), options)?)
            }
            None => Arc::new(InMemoryBackend::new()),
        };

        let engine = PersistenceEngine::new(backend, self.options)?;
        Ok(Chronolog {
            engine: Arc::new(engine),
            path: self.path,
        })
    }
}
