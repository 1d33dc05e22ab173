//! Error types for the commit log
//!
//! Every failure is returned to the caller of `append`, `save` or `load` as a
//! typed result. Nothing is swallowed except background stream-head updates,
//! which are reported through logging and worker statistics.
//!
//! | Variant | Recoverable | Retried internally |
//! |---------|-------------|--------------------|
//! | ConcurrencyConflict | by caller rebase | checkpoint collisions only, bounded |
//! | StorageUnavailable | by caller retry/backoff | no |
//! | Serialization | no | no |
//! | Configuration | no (fails at construction) | no |
//! | InvalidCommit | no | no |

use crate::types::StreamKey;
use thiserror::Error;

/// Why a commit was rejected as a concurrency conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    /// A commit with the same commit id is already stored
    DuplicateCommit,
    /// Another commit already claimed this commit sequence for the stream
    CommitSequence,
    /// The event batch overlaps a revision range already stored
    RevisionOverlap,
    /// Checkpoint allocation kept colliding and the retry budget ran out
    CheckpointExhausted,
}

impl ConflictKind {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::DuplicateCommit => "duplicate commit",
            ConflictKind::CommitSequence => "commit sequence taken",
            ConflictKind::RevisionOverlap => "revision overlap",
            ConflictKind::CheckpointExhausted => "checkpoint retries exhausted",
        }
    }
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All commit log errors
#[derive(Debug, Error)]
pub enum Error {
    /// Duplicate commit or overlapping-revision race
    ///
    /// `head_revision` is the stream's current head as read back from storage,
    /// so the caller can rebase its event batch on top of it.
    #[error("concurrency conflict on {key}: {kind} (head revision {head_revision})")]
    ConcurrencyConflict {
        /// Stream the commit targeted
        key: StreamKey,
        /// What collided
        kind: ConflictKind,
        /// Highest revision currently stored for the stream (0 if none)
        head_revision: u64,
    },

    /// Transient infrastructure fault
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Payload could not round-trip
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid options supplied at setup
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Commit attempt failed structural validation
    #[error("invalid commit: {0}")]
    InvalidCommit(String),
}

/// Result type for commit log operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error may succeed on retry
    ///
    /// Conflicts succeed after a rebase; storage faults after backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::ConcurrencyConflict { .. } | Error::StorageUnavailable(_)
        )
    }

    /// Check if this is a concurrency conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::ConcurrencyConflict { .. })
    }

    /// Conflict kind, if this is a concurrency conflict
    pub fn conflict_kind(&self) -> Option<ConflictKind> {
        match self {
            Error::ConcurrencyConflict { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
