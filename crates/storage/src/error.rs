//! Storage error types
//!
//! Uniqueness violations are reported as [`StorageError::Duplicate`] so the
//! commit writer can tell a lost race from an infrastructure fault.

use chronolog_core::{CheckpointToken, CommitId, ConflictKind, Error, StreamKey};
use thiserror::Error;

/// Which uniqueness constraint rejected a write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateKey {
    /// Checkpoint token already used by another commit
    Checkpoint {
        /// The contested token
        token: CheckpointToken,
        /// Stream of the commit that lost
        key: StreamKey,
    },
    /// Commit id already stored for the stream
    CommitId {
        /// Stream
        key: StreamKey,
        /// Duplicated id
        commit_id: CommitId,
    },
    /// Commit sequence already taken for the stream
    CommitSequence {
        /// Stream
        key: StreamKey,
        /// Contested sequence
        sequence: u64,
    },
    /// Revision range overlaps a stored commit
    RevisionOverlap {
        /// Stream
        key: StreamKey,
        /// First revision of the rejected batch
        first: u64,
        /// Last revision of the rejected batch
        last: u64,
    },
    /// A snapshot already exists at this revision
    SnapshotRevision {
        /// Stream
        key: StreamKey,
        /// Contested revision
        revision: u64,
    },
}

impl DuplicateKey {
    /// Stream the rejected write targeted
    pub fn stream_key(&self) -> &StreamKey {
        match self {
            DuplicateKey::Checkpoint { key, .. }
            | DuplicateKey::CommitId { key, .. }
            | DuplicateKey::CommitSequence { key, .. }
            | DuplicateKey::RevisionOverlap { key, .. }
            | DuplicateKey::SnapshotRevision { key, .. } => key,
        }
    }

    /// Conflict reported to the caller for this violation
    pub fn conflict_kind(&self) -> ConflictKind {
        match self {
            DuplicateKey::Checkpoint { .. } => ConflictKind::CheckpointExhausted,
            DuplicateKey::CommitId { .. } => ConflictKind::DuplicateCommit,
            DuplicateKey::CommitSequence { .. } | DuplicateKey::SnapshotRevision { .. } => {
                ConflictKind::CommitSequence
            }
            DuplicateKey::RevisionOverlap { .. } => ConflictKind::RevisionOverlap,
        }
    }
}

impl std::fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicateKey::Checkpoint { token, .. } => write!(f, "checkpoint {}", token),
            DuplicateKey::CommitId { key, commit_id } => {
                write!(f, "commit id {} on {}", commit_id, key)
            }
            DuplicateKey::CommitSequence { key, sequence } => {
                write!(f, "commit sequence {} on {}", sequence, key)
            }
            DuplicateKey::RevisionOverlap { key, first, last } => {
                write!(f, "revisions {}..={} on {}", first, last, key)
            }
            DuplicateKey::SnapshotRevision { key, revision } => {
                write!(f, "snapshot revision {} on {}", revision, key)
            }
        }
    }
}

/// Errors reported by a storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    /// A uniqueness constraint rejected the write
    #[error("duplicate {0}")]
    Duplicate(DuplicateKey),

    /// Commit sequence skips ahead of the stored stream
    #[error("commit sequence gap on {key}: expected {expected}, got {actual}")]
    SequenceGap {
        /// Stream
        key: StreamKey,
        /// Next sequence the stream accepts
        expected: u64,
        /// Sequence that was offered
        actual: u64,
    },

    /// Commit shape the backend cannot index
    #[error("malformed commit on {key}: {reason}")]
    Malformed {
        /// Stream
        key: StreamKey,
        /// What is wrong with it
        reason: String,
    },

    /// Record could not be encoded or decoded
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Transient infrastructure fault
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

impl StorageError {
    /// Check if this is a uniqueness violation
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StorageError::Duplicate(_))
    }
}

impl From<rmp_serde::encode::Error> for StorageError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        StorageError::Encoding(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for StorageError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        StorageError::Encoding(e.to_string())
    }
}

// Duplicates convert with an unknown head revision; the commit writer reads
// the real head back before surfacing a conflict.
impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Duplicate(dup) => Error::ConcurrencyConflict {
                key: dup.stream_key().clone(),
                kind: dup.conflict_kind(),
                head_revision: 0,
            },
            StorageError::SequenceGap {
                key,
                expected,
                actual,
            } => Error::InvalidCommit(format!(
                "commit sequence gap on {}: expected {}, got {}",
                key, expected, actual
            )),
            StorageError::Malformed { key, reason } => {
                Error::InvalidCommit(format!("malformed commit on {}: {}", key, reason))
            }
            StorageError::Encoding(msg) => Error::Serialization(msg),
            StorageError::Unavailable(msg) => Error::StorageUnavailable(msg),
            StorageError::Io(e) => Error::StorageUnavailable(e.to_string()),
        }
    }
}
