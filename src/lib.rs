//! # Chronolog
//!
//! Append-only event commit log for event-sourced systems.
//!
//! Chronolog stores batches of domain events as immutable commits, gives
//! every commit a global checkpoint position, detects concurrent writers
//! through the storage backend's uniqueness checks, and keeps per-stream
//! heads that tell a snapshot scheduler which streams are due.
//!
//! ## Quick Start
//!
//! ```ignore
//! use chronolog::prelude::*;
//!
//! let log = Chronolog::open("./data")?;
//!
//! let body = log.encode(&Deposited { amount: 10 })?;
//! let attempt = CommitAttempt::new(
//!     StreamKey::new("default", "account-1"),
//!     1, // stream revision
//!     1, // commit sequence
//!     vec![EventMessage::new(body)],
//! );
//! let commit = log.commit(attempt)?;
//!
//! for commit in log.get_from(CheckpointToken::ZERO)? {
//!     println!("{} {}", commit.checkpoint_token, commit.key);
//! }
//! ```
//!
//! ## Crates
//!
//! - `chronolog-core`: commits, heads, snapshots, typed payloads, errors
//! - `chronolog-storage`: backend contract, in-memory and file backends
//! - `chronolog-concurrency`: checkpoint generators and collision policy
//! - `chronolog-engine`: commit writer, head tracker, snapshot store

#![warn(missing_docs)]

mod chronolog;

pub mod prelude;

// Re-export main entry points
pub use crate::chronolog::{Chronolog, ChronologBuilder, LOG_FILE_NAME};
pub use chronolog_core::{Error, Result};

// Re-export the layers
pub use chronolog_concurrency as concurrency;
pub use chronolog_engine as engine;
pub use chronolog_storage as storage;
