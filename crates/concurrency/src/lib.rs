//! Concurrency layer for chronolog
//!
//! Checkpoint allocation is the one point of global contention in the
//! commit log. This crate provides:
//! - [`CheckpointGenerator`]: strictly increasing token allocation
//! - [`ConcurrencyStrategy`] / [`resolve`]: what to do when an allocated
//!   token loses the race for insertion
//! - [`RetryBudget`]: the bound on checkpoint retries per append
//!
//! Per-stream ordering is not handled here. It is enforced by the storage
//! backend's uniqueness check.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checkpoint;
pub mod strategy;

pub use checkpoint::{CheckpointGenerator, InMemoryCheckpointGenerator, StorageCheckpointGenerator};
pub use strategy::{resolve, ConcurrencyStrategy, Resolution, RetryBudget};
