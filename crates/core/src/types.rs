//! Identity types for the commit log
//!
//! This module defines the fundamental identifiers used throughout the system:
//! - [`CheckpointToken`]: Global, strictly increasing position of a commit
//! - [`CommitId`]: Unique identifier for idempotent retry detection
//! - [`StreamKey`]: Bucket + stream identity

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Global position of a commit in the store
///
/// Tokens are unique and strictly increasing in insertion order across the
/// whole store. They are NOT guaranteed to be contiguous: a failed checkpoint
/// allocation may leave a gap (see `ConcurrencyStrategy::Continue`).
///
/// # Examples
///
/// ```
/// use chronolog_core::types::CheckpointToken;
///
/// let first = CheckpointToken::new(1);
/// assert!(first > CheckpointToken::ZERO);
/// assert_eq!(first.next(), CheckpointToken::new(2));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct CheckpointToken(u64);

impl CheckpointToken {
    /// Position before every commit. Reading "from ZERO" yields the whole log.
    pub const ZERO: CheckpointToken = CheckpointToken(0);

    /// Wrap a raw token value
    pub const fn new(value: u64) -> Self {
        CheckpointToken(value)
    }

    /// Raw token value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// The token immediately after this one
    pub const fn next(&self) -> Self {
        CheckpointToken(self.0 + 1)
    }
}

impl From<u64> for CheckpointToken {
    fn from(value: u64) -> Self {
        CheckpointToken(value)
    }
}

impl std::fmt::Display for CheckpointToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a commit
///
/// Clients generate the id before the first attempt and reuse it on retry, so
/// a resend of an already-stored commit is detected instead of duplicated.
///
/// # Examples
///
/// ```
/// use chronolog_core::types::CommitId;
///
/// let a = CommitId::new();
/// let b = CommitId::new();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommitId(Uuid);

impl CommitId {
    /// Create a new random CommitId using UUID v4
    pub fn new() -> Self {
        CommitId(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(id: Uuid) -> Self {
        CommitId(id)
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CommitId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a stream: a bucket (partition) plus a stream id
///
/// Keys order by bucket, then stream. Stream-head enumeration relies on this
/// ordering to resume from a cursor.
///
/// # Examples
///
/// ```
/// use chronolog_core::types::StreamKey;
///
/// let key = StreamKey::new("default", "order-42");
/// assert_eq!(key.to_string(), "default/order-42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StreamKey {
    /// Logical partition of streams (tenant, application, ...)
    pub bucket_id: String,
    /// Stream identity within the bucket
    pub stream_id: String,
}

impl StreamKey {
    /// Create a new stream key
    pub fn new(bucket_id: impl Into<String>, stream_id: impl Into<String>) -> Self {
        Self {
            bucket_id: bucket_id.into(),
            stream_id: stream_id.into(),
        }
    }

    /// Check whether this stream lives in the given bucket
    pub fn in_bucket(&self, bucket_id: &str) -> bool {
        self.bucket_id == bucket_id
    }
}

impl std::fmt::Display for StreamKey {
    /// Display as `bucket/stream`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket_id, self.stream_id)
    }
}
