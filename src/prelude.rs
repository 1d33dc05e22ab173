//! Convenient imports for chronolog.
//!
//! ```ignore
//! use chronolog::prelude::*;
//!
//! let log = Chronolog::ephemeral()?;
//! ```

// Main entry point
pub use crate::chronolog::{Chronolog, ChronologBuilder};

// Error handling
pub use chronolog_core::{ConflictKind, Error, Result};

// Data model
pub use chronolog_core::{
    CheckpointToken, Commit, CommitAttempt, CommitId, EventMessage, Payload, PayloadType,
    Snapshot, StreamHead, StreamKey, Value,
};

// Configuration
pub use chronolog_concurrency::ConcurrencyStrategy;
pub use chronolog_core::SerializerKind;
pub use chronolog_engine::{HeadTracking, PersistenceOptions};
