//! Stream head tracking
//!
//! The tracker is the only writer of stream heads. Depending on
//! [`HeadTracking`] it writes them inline, hands them to the
//! [`HeadUpdateWorker`], or does nothing at all.
//!
//! Snapshot schedulers walk eligible streams with
//! [`StreamHeadTracker::streams_needing_snapshot`], a lazy paged iterator
//! that can be stopped and resumed from its cursor.

use crate::config::HeadTracking;
use crate::worker::{HeadTask, HeadUpdateWorker, HeadWorkerStats};
use chronolog_core::{Result, StreamHead, StreamKey};
use chronolog_storage::StorageBackend;
use std::collections::VecDeque;
use std::sync::Arc;

/// Heads fetched per page by [`StreamsNeedingSnapshot`]
pub const DEFAULT_PAGE_SIZE: usize = 128;

/// Maintains per-stream heads
pub struct StreamHeadTracker {
    backend: Arc<dyn StorageBackend>,
    mode: HeadTracking,
    worker: Option<HeadUpdateWorker>,
}

impl StreamHeadTracker {
    /// Create a tracker; `Background` spawns the worker thread
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        mode: HeadTracking,
        queue_capacity: usize,
    ) -> Result<Self> {
        let worker = match mode {
            HeadTracking::Background => {
                Some(HeadUpdateWorker::spawn(Arc::clone(&backend), queue_capacity)?)
            }
            HeadTracking::Disabled | HeadTracking::Synchronous => None,
        };
        Ok(Self {
            backend,
            mode,
            worker,
        })
    }

    /// Configured mode
    pub fn mode(&self) -> HeadTracking {
        self.mode
    }

    /// A commit reached `revision`
    ///
    /// In background mode this only queues the update.
    pub fn record_commit(&self, key: &StreamKey, revision: u64) -> Result<()> {
        self.dispatch(HeadTask::Commit {
            key: key.clone(),
            revision,
        })
    }

    /// A snapshot was saved at `revision`
    pub fn record_snapshot(&self, key: &StreamKey, revision: u64) -> Result<()> {
        self.dispatch(HeadTask::Snapshot {
            key: key.clone(),
            revision,
        })
    }

    fn dispatch(&self, task: HeadTask) -> Result<()> {
        match (self.mode, &self.worker) {
            (HeadTracking::Disabled, _) => Ok(()),
            (_, Some(worker)) => worker.submit(task),
            (_, None) => task.apply(self.backend.as_ref()),
        }
    }

    /// Stored head of a stream
    ///
    /// In background mode the head may lag behind the commits until
    /// [`flush`](Self::flush) returns.
    pub fn head(&self, key: &StreamKey) -> Result<Option<StreamHead>> {
        Ok(self.backend.stream_head(key)?)
    }

    /// Streams of `bucket_id` with at least `threshold` unsnapshotted events
    ///
    /// Always empty when tracking is disabled.
    pub fn streams_needing_snapshot(
        &self,
        bucket_id: &str,
        threshold: u64,
    ) -> StreamsNeedingSnapshot {
        let mut iter = StreamsNeedingSnapshot::new(Arc::clone(&self.backend), bucket_id, threshold);
        if !self.mode.is_enabled() {
            iter.done = true;
        }
        iter
    }

    /// Wait for queued head updates to land
    pub fn flush(&self) {
        if let Some(worker) = &self.worker {
            worker.flush();
        }
    }

    /// Background worker counters (zero unless in background mode)
    pub fn worker_stats(&self) -> HeadWorkerStats {
        self.worker
            .as_ref()
            .map(HeadUpdateWorker::stats)
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for StreamHeadTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHeadTracker")
            .field("backend", &self.backend.name())
            .field("mode", &self.mode)
            .field("worker", &self.worker)
            .finish()
    }
}

/// Lazy, restartable walk over heads that need a snapshot
///
/// Heads are fetched a page at a time in key order. [`cursor`](Self::cursor)
/// is the key of the last head yielded; passing it to
/// [`resume_after`](Self::resume_after) on a fresh iterator continues the
/// walk where it stopped, even across restarts.
///
/// A storage error is yielded once and ends the walk.
pub struct StreamsNeedingSnapshot {
    backend: Arc<dyn StorageBackend>,
    bucket_id: String,
    threshold: u64,
    page_size: usize,
    cursor: Option<StreamKey>,
    page: VecDeque<StreamHead>,
    done: bool,
}

impl StreamsNeedingSnapshot {
    fn new(backend: Arc<dyn StorageBackend>, bucket_id: &str, threshold: u64) -> Self {
        Self {
            backend,
            bucket_id: bucket_id.to_string(),
            threshold,
            page_size: DEFAULT_PAGE_SIZE,
            cursor: None,
            page: VecDeque::new(),
            done: false,
        }
    }

    /// Fetch `page_size` heads per storage round trip
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Skip every stream up to and including `cursor`
    pub fn resume_after(mut self, cursor: StreamKey) -> Self {
        self.cursor = Some(cursor);
        self.page.clear();
        self
    }

    /// Key of the last head yielded
    pub fn cursor(&self) -> Option<&StreamKey> {
        self.cursor.as_ref()
    }

    fn fill(&mut self) -> Result<()> {
        let heads = self.backend.heads_needing_snapshot(
            &self.bucket_id,
            self.threshold,
            self.cursor.as_ref(),
            self.page_size,
        )?;
        if heads.len() < self.page_size {
            self.done = true;
        }
        self.page.extend(heads);
        Ok(())
    }
}

impl Iterator for StreamsNeedingSnapshot {
    type Item = Result<StreamHead>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.page.is_empty() && !self.done {
            if let Err(e) = self.fill() {
                self.done = true;
                return Some(Err(e));
            }
        }
        let head = self.page.pop_front()?;
        self.cursor = Some(head.key.clone());
        Some(Ok(head))
    }
}

impl std::fmt::Debug for StreamsNeedingSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamsNeedingSnapshot")
            .field("bucket_id", &self.bucket_id)
            .field("threshold", &self.threshold)
            .field("cursor", &self.cursor)
            .field("done", &self.done)
            .finish()
    }
}
