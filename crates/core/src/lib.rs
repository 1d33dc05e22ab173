//! Core types for the chronolog commit log
//!
//! This crate defines the data model shared by every other layer:
//! - [`Commit`] / [`CommitAttempt`]: immutable event batches appended to a stream
//! - [`StreamHead`]: derived per-stream summary used for snapshot eligibility
//! - [`Snapshot`]: point-in-time stream state keyed by revision
//! - [`Value`] / [`Payload`]: tagged values carrying their runtime type
//! - [`Serializer`]: the narrow contract used to turn typed values into bytes
//! - [`Error`]: the error taxonomy surfaced to callers

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod commit;
pub mod error;
pub mod head;
pub mod serializer;
pub mod snapshot;
pub mod types;
pub mod value;

pub use commit::{Commit, CommitAttempt, EventMessage, Headers};
pub use error::{ConflictKind, Error, Result};
pub use head::StreamHead;
pub use serializer::{JsonSerializer, MsgPackSerializer, Serializer, SerializerKind};
pub use snapshot::Snapshot;
pub use types::{CheckpointToken, CommitId, StreamKey};
pub use value::{Payload, PayloadType, Value};
