//! Log records
//!
//! Every mutation of a [`FileBackend`](crate::FileBackend) is one record,
//! MessagePack-encoded into one frame. Replaying the records in file order
//! rebuilds the in-memory state.

use crate::error::StorageResult;
use chronolog_core::{Commit, Snapshot, StreamHead, StreamKey};
use serde::{Deserialize, Serialize};

/// One persisted mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogRecord {
    /// A stored commit
    Commit(Commit),
    /// The new value of a stream head
    Head(StreamHead),
    /// A stored snapshot
    Snapshot(Snapshot),
    /// A deleted stream
    DeleteStream(StreamKey),
    /// A purged bucket
    PurgeBucket(String),
    /// A full purge
    Purge,
}

impl LogRecord {
    /// Encode to MessagePack
    pub fn to_bytes(&self) -> StorageResult<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Decode from MessagePack
    pub fn from_bytes(bytes: &[u8]) -> StorageResult<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
