//! Commit Log Integration Tests
//!
//! End-to-end tests through the public `Chronolog` API: ordering, conflicts,
//! collision policies, head tracking, snapshots and restart.

#[path = "../common/mod.rs"]
mod common;

mod concurrency;
mod conflicts;
mod head_tracking;
mod persistence;
mod scenario;
mod serialization;
mod snapshots;
