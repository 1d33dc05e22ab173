//! Durable file backend
//!
//! An append-only log of [`LogRecord`] frames in front of an
//! [`InMemoryBackend`]. Every mutation is checked against the in-memory
//! state, written to the log, and only then made visible.
//!
//! # Recovery
//!
//! On open the log is replayed from the start. A bad frame (cut short,
//! failing its CRC, or empty) with no valid record anywhere after it is the
//! remains of an interrupted write: it is truncated away with a warning and
//! the backend opens with everything before it. A bad frame followed by a
//! valid record is damage inside the log and fails the open.
//!
//! A write or fsync that fails is rolled back to the previous end of file,
//! so the log never keeps a record the caller was told failed. If the
//! rollback itself fails the backend refuses further writes until reopened.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use crate::format::{decode_frame, decode_header, encode_frame, encode_header, DecodeOutcome};
use crate::format::{LogRecord, HEADER_SIZE};
use crate::memory::InMemoryBackend;
use chronolog_core::{CheckpointToken, Commit, CommitId, Snapshot, StreamHead, StreamKey};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Options for [`FileBackend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileBackendOptions {
    /// fsync after every record (default: true)
    pub sync_on_write: bool,
}

impl Default for FileBackendOptions {
    fn default() -> Self {
        Self {
            sync_on_write: true,
        }
    }
}

/// File operations the log writer needs
trait LogFile: Send {
    fn byte_len(&self) -> io::Result<u64>;
    fn append_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;
    fn sync(&self) -> io::Result<()>;
    fn truncate_to(&self, len: u64) -> io::Result<()>;
}

impl LogFile for File {
    fn byte_len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn append_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)
    }

    fn sync(&self) -> io::Result<()> {
        self.sync_data()
    }

    fn truncate_to(&self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

struct LogWriter {
    file: Box<dyn LogFile>,
    /// A failed write could not be rolled back
    damaged: bool,
}

/// Append-only file backend
pub struct FileBackend {
    path: PathBuf,
    options: FileBackendOptions,
    memory: InMemoryBackend,
    writer: Mutex<LogWriter>,
}

impl FileBackend {
    /// Open or create the log at `path`
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Encoding`] for a bad file header, a
    /// CRC-valid frame that does not decode, or a damaged frame followed by
    /// valid records, and [`StorageError::Io`] for filesystem failures.
    pub fn open(path: impl AsRef<Path>, options: FileBackendOptions) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let memory = InMemoryBackend::new();

        if !path.exists() {
            let mut file = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&path)?;
            file.write_all(&encode_header())?;
            file.sync_all()?;
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                File::open(parent)?.sync_all()?;
            }
            info!(path = %path.display(), "created commit log");
            return Ok(Self::from_parts(path, options, memory, file));
        }

        let data = std::fs::read(&path)?;
        decode_header(&data)?;

        let mut offset = HEADER_SIZE;
        let mut records = 0usize;
        while offset < data.len() {
            match decode_frame(&data[offset..]) {
                DecodeOutcome::Complete { payload, consumed } if !payload.is_empty() => {
                    Self::replay(&memory, LogRecord::from_bytes(payload)?)?;
                    offset += consumed;
                    records += 1;
                }
                outcome => {
                    if let Some(next) = next_record_offset(&data, offset + 1) {
                        return Err(StorageError::Encoding(format!(
                            "commit log {} is damaged at offset {} ({:?}) with records from offset {} on",
                            path.display(),
                            offset,
                            outcome,
                            next
                        )));
                    }
                    warn!(
                        path = %path.display(),
                        offset,
                        dropped = data.len() - offset,
                        ?outcome,
                        "truncating torn tail of commit log"
                    );
                    let file = OpenOptions::new().write(true).open(&path)?;
                    file.set_len(offset as u64)?;
                    file.sync_all()?;
                    break;
                }
            }
        }

        let file = OpenOptions::new().append(true).open(&path)?;
        let max_checkpoint = memory.max_checkpoint()?;
        info!(
            path = %path.display(),
            records,
            commits = memory.commit_count(),
            %max_checkpoint,
            "replayed commit log"
        );
        Ok(Self::from_parts(path, options, memory, file))
    }

    fn from_parts(
        path: PathBuf,
        options: FileBackendOptions,
        memory: InMemoryBackend,
        file: File,
    ) -> Self {
        Self {
            path,
            options,
            memory,
            writer: Mutex::new(LogWriter {
                file: Box::new(file),
                damaged: false,
            }),
        }
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn replay(memory: &InMemoryBackend, record: LogRecord) -> StorageResult<()> {
        match record {
            LogRecord::Commit(commit) => memory.insert_commit(&commit),
            LogRecord::Head(head) => {
                memory.restore_head(head);
                Ok(())
            }
            LogRecord::Snapshot(snapshot) => memory.insert_snapshot(&snapshot),
            LogRecord::DeleteStream(key) => memory.delete_stream(&key),
            LogRecord::PurgeBucket(bucket_id) => memory.purge_bucket(&bucket_id),
            LogRecord::Purge => memory.purge(),
        }
        .map_err(|e| StorageError::Encoding(format!("log replay rejected a record: {}", e)))
    }

    fn append(&self, record: &LogRecord) -> StorageResult<()> {
        let frame = encode_frame(&record.to_bytes()?)?;
        let mut writer = self.writer.lock();
        if writer.damaged {
            return Err(StorageError::Unavailable(format!(
                "commit log {} has an unrolled partial write; reopen to recover",
                self.path.display()
            )));
        }

        let end = writer.file.byte_len()?;
        let written = writer.file.append_bytes(&frame).and_then(|()| {
            if self.options.sync_on_write {
                writer.file.sync()
            } else {
                Ok(())
            }
        });
        let Err(e) = written else {
            return Ok(());
        };

        let rollback = writer.file.truncate_to(end).and_then(|()| {
            if self.options.sync_on_write {
                writer.file.sync()
            } else {
                Ok(())
            }
        });
        match rollback {
            Ok(()) => warn!(path = %self.path.display(), error = %e, "log write failed, rolled back"),
            Err(rollback) => {
                writer.damaged = true;
                error!(
                    path = %self.path.display(),
                    error = %e,
                    rollback_error = %rollback,
                    "log write failed and could not be rolled back"
                );
            }
        }
        Err(e.into())
    }
}

/// Offset of the first decodable record at or after `from`
fn next_record_offset(data: &[u8], from: usize) -> Option<usize> {
    (from..data.len()).find(|&at| match decode_frame(&data[at..]) {
        DecodeOutcome::Complete { payload, .. } => {
            !payload.is_empty() && LogRecord::from_bytes(payload).is_ok()
        }
        _ => false,
    })
}

impl std::fmt::Debug for FileBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileBackend")
            .field("path", &self.path)
            .field("options", &self.options)
            .field("memory", &self.memory)
            .finish()
    }
}

impl StorageBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    fn insert_commit(&self, commit: &Commit) -> StorageResult<()> {
        self.memory.insert_commit_with(commit, |c| {
            self.append(&LogRecord::Commit(c.clone()))?;
            debug!(checkpoint = %c.checkpoint_token, stream = %c.key, "commit persisted");
            Ok(())
        })
    }

    fn max_checkpoint(&self) -> StorageResult<CheckpointToken> {
        self.memory.max_checkpoint()
    }

    fn commits_from(&self, after: CheckpointToken, limit: usize) -> StorageResult<Vec<Commit>> {
        self.memory.commits_from(after, limit)
    }

    fn commits_in_range(
        &self,
        from: CheckpointToken,
        to: CheckpointToken,
    ) -> StorageResult<Vec<Commit>> {
        self.memory.commits_in_range(from, to)
    }

    fn stream_commits(
        &self,
        key: &StreamKey,
        min_revision: u64,
        max_revision: u64,
    ) -> StorageResult<Vec<Commit>> {
        self.memory.stream_commits(key, min_revision, max_revision)
    }

    fn latest_commit(&self, key: &StreamKey) -> StorageResult<Option<Commit>> {
        self.memory.latest_commit(key)
    }

    fn commit_by_id(&self, key: &StreamKey, commit_id: &CommitId) -> StorageResult<Option<Commit>> {
        self.memory.commit_by_id(key, commit_id)
    }

    fn update_stream_head(
        &self,
        key: &StreamKey,
        update: &dyn Fn(&mut StreamHead),
    ) -> StorageResult<StreamHead> {
        self.memory.update_stream_head_with(key, update, |head| {
            self.append(&LogRecord::Head(head.clone()))
        })
    }

    fn stream_head(&self, key: &StreamKey) -> StorageResult<Option<StreamHead>> {
        self.memory.stream_head(key)
    }

    fn heads_needing_snapshot(
        &self,
        bucket_id: &str,
        threshold: u64,
        after: Option<&StreamKey>,
        limit: usize,
    ) -> StorageResult<Vec<StreamHead>> {
        self.memory
            .heads_needing_snapshot(bucket_id, threshold, after, limit)
    }

    fn insert_snapshot(&self, snapshot: &Snapshot) -> StorageResult<()> {
        self.memory.insert_snapshot_with(snapshot, |s| {
            self.append(&LogRecord::Snapshot(s.clone()))
        })
    }

    fn latest_snapshot(
        &self,
        key: &StreamKey,
        max_revision: u64,
    ) -> StorageResult<Option<Snapshot>> {
        self.memory.latest_snapshot(key, max_revision)
    }

    fn delete_stream(&self, key: &StreamKey) -> StorageResult<()> {
        self.append(&LogRecord::DeleteStream(key.clone()))?;
        self.memory.delete_stream(key)
    }

    fn purge_bucket(&self, bucket_id: &str) -> StorageResult<()> {
        self.append(&LogRecord::PurgeBucket(bucket_id.to_string()))?;
        self.memory.purge_bucket(bucket_id)
    }

    fn purge(&self) -> StorageResult<()> {
        self.append(&LogRecord::Purge)?;
        self.memory.purge()
    }
}
