//! Commit writer
//!
//! ## Append sequence
//!
//! ```text
//! 1. validate the attempt (no checkpoint is spent on a malformed commit)
//! 2. allocate a checkpoint token
//! 3. insert; the backend checks token, commit id, sequence and revisions
//! 4. token collision      -> on_collision + resolve(strategy): retry,
//!                            fill the hole and retry, or give up
//!    stream conflict      -> read back the head revision, report conflict
//!    anything else        -> report
//! 5. success              -> record the head (inline, queued, or not at all)
//! ```
//!
//! Under FillHole every token the writer allocated but could not use gets a
//! placeholder, whether the insert lost a token race or a stream race, so
//! checkpoint readers never wait on a token that will stay empty.
//!
//! No lock is held across any of this. Commits to distinct streams proceed
//! in parallel; per-stream ordering comes from the backend's uniqueness check.

use crate::heads::StreamHeadTracker;
use chronolog_concurrency::{resolve, CheckpointGenerator, ConcurrencyStrategy, Resolution, RetryBudget};
use chronolog_core::{
    CheckpointToken, Commit, CommitAttempt, ConflictKind, Error, Result, StreamKey,
};
use chronolog_storage::{DuplicateKey, StorageBackend, StorageError};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Appends commits
pub struct CommitWriter {
    backend: Arc<dyn StorageBackend>,
    generator: Arc<dyn CheckpointGenerator>,
    heads: Arc<StreamHeadTracker>,
    strategy: ConcurrencyStrategy,
    budget: RetryBudget,
    system_bucket: String,
}

impl CommitWriter {
    /// Create a writer
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        generator: Arc<dyn CheckpointGenerator>,
        heads: Arc<StreamHeadTracker>,
        strategy: ConcurrencyStrategy,
        budget: RetryBudget,
        system_bucket: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            generator,
            heads,
            strategy,
            budget,
            system_bucket: system_bucket.into(),
        }
    }

    /// Append a commit and return it with its checkpoint token
    ///
    /// # Errors
    ///
    /// - `InvalidCommit`: the attempt is malformed or skips a sequence
    /// - `ConcurrencyConflict`: the commit id, sequence or revisions are
    ///   taken (`head_revision` is read back), or checkpoint retries ran out
    /// - `StorageUnavailable`: the backend failed
    pub fn append(&self, attempt: CommitAttempt) -> Result<Commit> {
        attempt.validate()?;
        let mut commit = attempt.into_commit(CheckpointToken::ZERO);

        let mut attempt_no = 0u32;
        loop {
            attempt_no += 1;
            let token = self.generator.next()?;
            commit.checkpoint_token = token;

            let failure = match self.backend.insert_commit(&commit) {
                Ok(()) => {
                    debug!(
                        checkpoint = %token,
                        stream = %commit.key,
                        revision = commit.stream_revision,
                        events = commit.event_count(),
                        "commit appended"
                    );
                    self.record_head(&commit);
                    return Ok(commit);
                }
                Err(e) => e,
            };

            match failure {
                StorageError::Duplicate(DuplicateKey::Checkpoint { .. }) => {
                    warn!(checkpoint = %token, stream = %commit.key, attempt = attempt_no, "checkpoint collision");
                    self.generator.on_collision(token)?;
                    match resolve(self.strategy, token, attempt_no, self.budget) {
                        Resolution::Retry => {}
                        Resolution::FillHoleThenRetry(hole) => self.fill_hole(hole)?,
                        Resolution::GiveUp => {
                            warn!(stream = %commit.key, attempts = attempt_no, "checkpoint retries exhausted");
                            return Err(self.conflict(&commit.key, ConflictKind::CheckpointExhausted)?);
                        }
                    }
                }
                StorageError::Duplicate(dup) => {
                    self.release_token(token);
                    let kind = dup.conflict_kind();
                    warn!(stream = %commit.key, sequence = commit.commit_sequence, %kind, "commit rejected");
                    return Err(self.conflict(&commit.key, kind)?);
                }
                other => {
                    self.release_token(token);
                    return Err(other.into());
                }
            }
        }
    }

    /// Conflict error carrying the stream's current head revision
    fn conflict(&self, key: &StreamKey, kind: ConflictKind) -> Result<Error> {
        let head_revision = self
            .backend
            .latest_commit(key)?
            .map_or(0, |c| c.stream_revision);
        Ok(Error::ConcurrencyConflict {
            key: key.clone(),
            kind,
            head_revision,
        })
    }

    /// Write a placeholder at `token`; a token already taken needs none
    fn fill_hole(&self, token: CheckpointToken) -> Result<()> {
        match self
            .backend
            .insert_commit(&Commit::placeholder(&self.system_bucket, token))
        {
            Ok(()) => {
                debug!(checkpoint = %token, "placeholder written");
                Ok(())
            }
            Err(StorageError::Duplicate(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Give back a token this writer allocated but did not use
    ///
    /// Best effort: the caller is already returning an error.
    fn release_token(&self, token: CheckpointToken) {
        if !self.strategy.fills_holes() {
            return;
        }
        if let Err(e) = self.fill_hole(token) {
            warn!(checkpoint = %token, error = %e, "could not fill unused checkpoint");
        }
    }

    fn record_head(&self, commit: &Commit) {
        if let Err(e) = self.heads.record_commit(&commit.key, commit.stream_revision) {
            error!(
                stream = %commit.key,
                revision = commit.stream_revision,
                error = %e,
                "commit stored but stream head not updated"
            );
        }
    }

    /// Collision policy in use
    pub fn strategy(&self) -> ConcurrencyStrategy {
        self.strategy
    }
}

impl std::fmt::Debug for CommitWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitWriter")
            .field("backend", &self.backend.name())
            .field("strategy", &self.strategy)
            .field("budget", &self.budget)
            .field("system_bucket", &self.system_bucket)
            .finish()
    }
}
