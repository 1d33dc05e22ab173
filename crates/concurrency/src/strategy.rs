//! Checkpoint collision policy
//!
//! When an allocated checkpoint token loses the race for insertion, the
//! commit writer asks [`resolve`] what to do next. The answer depends only
//! on the configured strategy and how many attempts were already spent.
//!
//! ```text
//!            collision on token t, attempt n
//!                        │
//!           n >= max_attempts? ── yes ──► GiveUp
//!                        │ no
//!          ┌─────────────┴─────────────┐
//!       Continue                    FillHole
//!          │                           │
//!        Retry              FillHoleThenRetry(t)
//! ```

use chronolog_core::{CheckpointToken, Error, Result};
use serde::Deserialize;

/// How checkpoint collisions are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyStrategy {
    /// Drop the failed token and retry with a fresh one
    ///
    /// Leaves a permanent gap; checkpoint-ordered readers must tolerate
    /// non-contiguous tokens.
    #[default]
    Continue,
    /// Write a zero-event placeholder at the failed token, then retry
    ///
    /// One extra write per collision buys contiguous token delivery.
    #[serde(alias = "fill_hole", alias = "fill-hole")]
    FillHole,
}

impl ConcurrencyStrategy {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ConcurrencyStrategy::Continue => "continue",
            ConcurrencyStrategy::FillHole => "fillhole",
        }
    }

    /// Whether allocated-but-unused tokens get a placeholder
    pub fn fills_holes(&self) -> bool {
        matches!(self, ConcurrencyStrategy::FillHole)
    }
}

impl std::fmt::Display for ConcurrencyStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Next step after a checkpoint collision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Allocate a fresh token and retry the insert
    Retry,
    /// Insert a placeholder at the token, then retry with a fresh one
    FillHoleThenRetry(CheckpointToken),
    /// Stop and report a conflict
    GiveUp,
}

/// Decide what to do after `failed` collided on attempt `attempt` (1-based)
///
/// # Example
///
/// ```
/// use chronolog_concurrency::{resolve, ConcurrencyStrategy, Resolution, RetryBudget};
/// use chronolog_core::CheckpointToken;
///
/// let budget = RetryBudget::default();
/// let t = CheckpointToken::new(7);
/// assert_eq!(resolve(ConcurrencyStrategy::Continue, t, 1, budget), Resolution::Retry);
/// assert_eq!(
///     resolve(ConcurrencyStrategy::FillHole, t, 1, budget),
///     Resolution::FillHoleThenRetry(t)
/// );
/// assert_eq!(resolve(ConcurrencyStrategy::Continue, t, 5, budget), Resolution::GiveUp);
/// ```
pub fn resolve(
    strategy: ConcurrencyStrategy,
    failed: CheckpointToken,
    attempt: u32,
    budget: RetryBudget,
) -> Resolution {
    if budget.is_exhausted(attempt) {
        return Resolution::GiveUp;
    }
    match strategy {
        ConcurrencyStrategy::Continue => Resolution::Retry,
        ConcurrencyStrategy::FillHole => Resolution::FillHoleThenRetry(failed),
    }
}

/// Maximum number of checkpoint allocations per append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget(u32);

impl RetryBudget {
    /// Default number of attempts
    pub const DEFAULT_ATTEMPTS: u32 = 5;

    /// Create a budget of `max_attempts` (at least 1)
    pub fn new(max_attempts: u32) -> Result<Self> {
        if max_attempts == 0 {
            return Err(Error::Configuration(
                "max_checkpoint_attempts must be at least 1".into(),
            ));
        }
        Ok(RetryBudget(max_attempts))
    }

    /// Total attempts allowed
    pub fn max_attempts(&self) -> u32 {
        self.0
    }

    /// Whether `attempt` (1-based) was the last one allowed
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        attempt >= self.0
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        RetryBudget(Self::DEFAULT_ATTEMPTS)
    }
}
