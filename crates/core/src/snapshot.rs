//! Snapshot type
//!
//! A snapshot is the persisted state of a stream at one revision. Snapshots
//! are immutable: a newer snapshot supersedes an older one, it never
//! overwrites it.

use crate::types::StreamKey;
use crate::value::Payload;
use serde::{Deserialize, Serialize};

/// Point-in-time payload for a stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Stream identity
    pub key: StreamKey,
    /// Revision the payload represents
    pub stream_revision: u64,
    /// Opaque state, type tag included
    pub payload: Payload,
}

impl Snapshot {
    /// Create a snapshot
    pub fn new(key: StreamKey, stream_revision: u64, payload: Payload) -> Self {
        Self {
            key,
            stream_revision,
            payload,
        }
    }
}
