//! Persistence options
//!
//! Options are fixed when the engine is built and checked once by
//! [`PersistenceOptions::validate`]. Invalid values fail construction with
//! `Error::Configuration`; nothing is re-checked at runtime.
//!
//! Options can be assembled in code with [`PersistenceOptions::builder`] or
//! read from TOML:
//!
//! ```toml
//! concurrency_strategy = "fillhole"
//! system_bucket = "system"
//! head_tracking = "background"
//! max_checkpoint_attempts = 5
//! head_queue_capacity = 1024
//! serializer = "msgpack"
//! ```

use chronolog_concurrency::{ConcurrencyStrategy, RetryBudget};
use chronolog_core::{Error, Result, SerializerKind};
use serde::Deserialize;
use std::path::Path;

/// How stream heads are maintained after each commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadTracking {
    /// No head writes; snapshot enumeration yields nothing
    Disabled,
    /// `append` returns after the head write
    Synchronous,
    /// Head writes are queued to a background worker
    ///
    /// `append` returns once the update is queued. With the queue full it
    /// waits for a free slot; updates are never dropped.
    #[default]
    Background,
}

impl HeadTracking {
    /// Whether heads are maintained at all
    pub fn is_enabled(&self) -> bool {
        !matches!(self, HeadTracking::Disabled)
    }
}

/// Engine options
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PersistenceOptions {
    /// Policy for checkpoint collisions
    pub concurrency_strategy: ConcurrencyStrategy,
    /// Bucket that holds placeholder commits
    pub system_bucket: String,
    /// Stream head maintenance mode
    pub head_tracking: HeadTracking,
    /// Checkpoint allocations per append before giving up
    pub max_checkpoint_attempts: u32,
    /// Bound of the background head-update queue; appends wait when it is full
    pub head_queue_capacity: usize,
    /// Serializer for payloads encoded through the engine
    pub serializer: SerializerKind,
}

impl Default for PersistenceOptions {
    fn default() -> Self {
        Self {
            concurrency_strategy: ConcurrencyStrategy::default(),
            system_bucket: "system".to_string(),
            head_tracking: HeadTracking::default(),
            max_checkpoint_attempts: RetryBudget::DEFAULT_ATTEMPTS,
            head_queue_capacity: 1024,
            serializer: SerializerKind::default(),
        }
    }
}

impl PersistenceOptions {
    /// Start from the defaults
    pub fn builder() -> PersistenceOptionsBuilder {
        PersistenceOptionsBuilder::new()
    }

    /// Parse and validate TOML
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let options: PersistenceOptions =
            toml::from_str(text).map_err(|e| Error::Configuration(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Read, parse and validate a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        self.retry_budget()?;
        if self.system_bucket.trim().is_empty() {
            return Err(Error::Configuration("system_bucket must not be empty".into()));
        }
        if self.head_queue_capacity == 0 {
            return Err(Error::Configuration(
                "head_queue_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Checkpoint retry bound
    pub fn retry_budget(&self) -> Result<RetryBudget> {
        RetryBudget::new(self.max_checkpoint_attempts)
    }
}

/// Builder for [`PersistenceOptions`]
///
/// # Example
///
/// ```
/// use chronolog_engine::{HeadTracking, PersistenceOptions};
/// use chronolog_concurrency::ConcurrencyStrategy;
///
/// let options = PersistenceOptions::builder()
///     .fill_holes()
///     .head_tracking(HeadTracking::Synchronous)
///     .build()
///     .unwrap();
/// assert_eq!(options.concurrency_strategy, ConcurrencyStrategy::FillHole);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PersistenceOptionsBuilder {
    options: PersistenceOptions,
}

impl PersistenceOptionsBuilder {
    /// Create a builder with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the collision policy
    pub fn concurrency_strategy(mut self, strategy: ConcurrencyStrategy) -> Self {
        self.options.concurrency_strategy = strategy;
        self
    }

    /// Shorthand for [`ConcurrencyStrategy::FillHole`]
    pub fn fill_holes(self) -> Self {
        self.concurrency_strategy(ConcurrencyStrategy::FillHole)
    }

    /// Set the placeholder bucket
    pub fn system_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.options.system_bucket = bucket.into();
        self
    }

    /// Set the head maintenance mode
    pub fn head_tracking(mut self, mode: HeadTracking) -> Self {
        self.options.head_tracking = mode;
        self
    }

    /// Turn head maintenance off
    pub fn disable_head_tracking(self) -> Self {
        self.head_tracking(HeadTracking::Disabled)
    }

    /// Set the checkpoint retry bound
    pub fn max_checkpoint_attempts(mut self, attempts: u32) -> Self {
        self.options.max_checkpoint_attempts = attempts;
        self
    }

    /// Set the background queue bound
    pub fn head_queue_capacity(mut self, capacity: usize) -> Self {
        self.options.head_queue_capacity = capacity;
        self
    }

    /// Set the payload serializer
    pub fn serializer(mut self, serializer: SerializerKind) -> Self {
        self.options.serializer = serializer;
        self
    }

    /// Validate and return the options
    pub fn build(self) -> Result<PersistenceOptions> {
        self.options.validate()?;
        Ok(self.options)
    }
}
