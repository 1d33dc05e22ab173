//! Commit log engine for chronolog
//!
//! This crate assembles the commit log from the lower layers:
//! - [`CommitWriter`]: checkpoint allocation, insertion, conflict resolution
//! - [`StreamHeadTracker`]: per-stream heads, inline or via [`HeadUpdateWorker`]
//! - [`SnapshotStore`]: immutable snapshots keyed by revision
//! - [`PersistenceEngine`]: the facade tying them together
//! - [`PersistenceOptions`]: validated configuration, from code or TOML
//!
//! # Head tracking modes
//!
//! | Mode | Head write | `append` waits | Snapshot enumeration |
//! |------|------------|----------------|----------------------|
//! | Disabled | never | - | always empty |
//! | Synchronous | inline | yes | exact |
//! | Background | worker thread | only while the queue is full | eventually exact |
//!
//! Background updates are never dropped. When the queue holds
//! `head_queue_capacity` updates, `append` blocks until the worker frees a
//! slot; size the queue for the expected write burst.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod engine;
pub mod heads;
pub mod snapshots;
pub mod worker;
pub mod writer;

pub use config::{HeadTracking, PersistenceOptions, PersistenceOptionsBuilder};
pub use engine::PersistenceEngine;
pub use heads::{StreamHeadTracker, StreamsNeedingSnapshot};
pub use snapshots::SnapshotStore;
pub use worker::{HeadTask, HeadUpdateWorker, HeadWorkerStats};
pub use writer::CommitWriter;
