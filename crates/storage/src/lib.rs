//! Storage layer for chronolog
//!
//! This crate defines the storage backend contract and ships two backends:
//! - [`InMemoryBackend`]: DashMap-sharded, per-stream uniqueness checks
//! - [`FileBackend`]: durable append-only log replayed into memory on open
//!
//! A backend must enforce uniqueness on `(bucket, stream, commit_sequence)`,
//! on non-overlapping revision ranges and on checkpoint tokens, and must
//! report those violations distinguishably from other failures
//! ([`StorageError::Duplicate`] vs [`StorageError::Unavailable`]).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod file;
pub mod format;
pub mod memory;

pub use backend::StorageBackend;
pub use error::{DuplicateKey, StorageError, StorageResult};
pub use file::{FileBackend, FileBackendOptions};
pub use memory::InMemoryBackend;
