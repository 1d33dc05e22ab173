//! Background stream-head worker
//!
//! One thread drains a bounded queue of head updates. Producers block when
//! the queue is full, which bounds memory under a sustained write burst.
//!
//! Updates are applied in queue order and each one only moves a head
//! forward, so a retried or repeated update is harmless. Failures are
//! retried a few times, then logged and counted. They never reach the
//! append that produced the update: the commit is already durable.

use chronolog_core::{Error, Result, StreamKey};
use chronolog_storage::StorageBackend;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Attempts per task before it is dropped
const MAX_TASK_ATTEMPTS: u32 = 3;

/// Base delay between attempts
const RETRY_BACKOFF: Duration = Duration::from_millis(5);

/// A queued head update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadTask {
    /// A commit reached `revision`
    Commit {
        /// Stream
        key: StreamKey,
        /// Committed revision
        revision: u64,
    },
    /// A snapshot was saved at `revision`
    Snapshot {
        /// Stream
        key: StreamKey,
        /// Snapshot revision
        revision: u64,
    },
}

impl HeadTask {
    fn key(&self) -> &StreamKey {
        match self {
            HeadTask::Commit { key, .. } | HeadTask::Snapshot { key, .. } => key,
        }
    }

    /// Apply this task to the stored head
    pub(crate) fn apply(&self, backend: &dyn StorageBackend) -> Result<()> {
        match self {
            HeadTask::Commit { key, revision } => {
                let revision = *revision;
                backend.update_stream_head(key, &move |h| h.apply_commit(revision))?;
            }
            HeadTask::Snapshot { key, revision } => {
                let revision = *revision;
                backend.update_stream_head(key, &move |h| h.apply_snapshot(revision))?;
            }
        }
        Ok(())
    }
}

/// Counters exposed by [`HeadUpdateWorker::stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadWorkerStats {
    /// Tasks applied
    pub applied: u64,
    /// Extra attempts spent on failing tasks
    pub retried: u64,
    /// Tasks dropped after exhausting their attempts
    pub failed: u64,
}

#[derive(Default)]
struct Shared {
    pending: Mutex<usize>,
    drained: Condvar,
    applied: AtomicU64,
    retried: AtomicU64,
    failed: AtomicU64,
}

impl Shared {
    fn finish_one(&self) {
        let mut pending = self.pending.lock();
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.drained.notify_all();
        }
    }
}

/// Bounded queue plus one worker thread
///
/// Dropping the worker closes the queue, lets the thread apply what is left
/// and joins it.
pub struct HeadUpdateWorker {
    sender: Option<SyncSender<HeadTask>>,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl HeadUpdateWorker {
    /// Spawn the worker thread
    pub fn spawn(backend: Arc<dyn StorageBackend>, capacity: usize) -> Result<Self> {
        let (sender, receiver) = sync_channel(capacity);
        let shared = Arc::new(Shared::default());
        let thread_shared = Arc::clone(&shared);

        let handle = thread::Builder::new()
            .name("chronolog-heads".to_string())
            .spawn(move || run(backend, receiver, thread_shared))
            .map_err(|e| Error::StorageUnavailable(format!("cannot spawn head worker: {}", e)))?;

        debug!(capacity, "head worker started");
        Ok(Self {
            sender: Some(sender),
            shared,
            handle: Some(handle),
        })
    }

    /// Queue a task, blocking while the queue is full
    ///
    /// Tasks are never dropped for lack of room.
    pub fn submit(&self, task: HeadTask) -> Result<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| Error::StorageUnavailable("head worker stopped".into()))?;

        *self.shared.pending.lock() += 1;
        if sender.send(task).is_err() {
            self.shared.finish_one();
            return Err(Error::StorageUnavailable("head worker stopped".into()));
        }
        Ok(())
    }

    /// Block until every queued task has been applied or dropped
    pub fn flush(&self) {
        let mut pending = self.shared.pending.lock();
        while *pending > 0 {
            self.shared.drained.wait(&mut pending);
        }
    }

    /// Tasks queued or in flight
    pub fn pending(&self) -> usize {
        *self.shared.pending.lock()
    }

    /// Snapshot of the worker counters
    pub fn stats(&self) -> HeadWorkerStats {
        HeadWorkerStats {
            applied: self.shared.applied.load(Ordering::Relaxed),
            retried: self.shared.retried.load(Ordering::Relaxed),
            failed: self.shared.failed.load(Ordering::Relaxed),
        }
    }
}

impl Drop for HeadUpdateWorker {
    fn drop(&mut self) {
        // closing the channel ends the loop once the queue is empty
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("head worker panicked");
            }
        }
        debug!(stats = ?self.stats(), "head worker stopped");
    }
}

impl std::fmt::Debug for HeadUpdateWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadUpdateWorker")
            .field("pending", &self.pending())
            .field("stats", &self.stats())
            .finish()
    }
}

fn run(backend: Arc<dyn StorageBackend>, receiver: Receiver<HeadTask>, shared: Arc<Shared>) {
    for task in receiver {
        let mut attempt = 1;
        loop {
            match task.apply(backend.as_ref()) {
                Ok(()) => {
                    shared.applied.fetch_add(1, Ordering::Relaxed);
                    break;
                }
                Err(e) if attempt < MAX_TASK_ATTEMPTS => {
                    warn!(stream = %task.key(), attempt, error = %e, "retrying stream head update");
                    shared.retried.fetch_add(1, Ordering::Relaxed);
                    thread::sleep(RETRY_BACKOFF * attempt);
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        stream = %task.key(),
                        attempts = attempt,
                        error = %e,
                        "dropping stream head update"
                    );
                    shared.failed.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }
        }
        shared.finish_one();
    }
}
