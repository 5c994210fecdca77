//! Bounded retry with per-attempt backoff and cancellation
//!
//! A [`RetryPolicy`] is an immutable value: a retry count plus an ordered
//! list of delays. Cloning shares the delay list.
//!
//! [`retry_with_backoff`] runs an operation up to `1 + max_retries` times.
//! The cancellation token is checked before every attempt and raced against
//! every backoff sleep.

use crate::error::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Default backoff sequence
pub const DEFAULT_BACKOFF: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

/// Retry count and backoff delays
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: usize,
    backoff: Arc<[Duration]>,
}

impl RetryPolicy {
    /// Create a policy. An empty `backoff` falls back to [`DEFAULT_BACKOFF`].
    pub fn new(max_retries: usize, backoff: impl Into<Vec<Duration>>) -> Self {
        let mut backoff = backoff.into();
        if backoff.is_empty() {
            backoff = DEFAULT_BACKOFF.to_vec();
        }
        Self {
            max_retries,
            backoff: backoff.into(),
        }
    }

    /// A policy that never retries
    pub fn no_retry() -> Self {
        Self::new(0, DEFAULT_BACKOFF.to_vec())
    }

    /// Retries after the first attempt
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Total attempts, first one included
    pub fn max_attempts(&self) -> usize {
        self.max_retries + 1
    }

    /// Configured delays
    pub fn backoff(&self) -> &[Duration] {
        &self.backoff
    }

    /// Delay after failed attempt number `attempt` (1-based).
    /// Indexes past the end reuse the last delay.
    pub fn backoff_for(&self, attempt: usize) -> Duration {
        let index = attempt.saturating_sub(1).min(self.backoff.len() - 1);
        self.backoff[index]
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BACKOFF.to_vec())
    }
}

/// Run `op` until it succeeds, attempts run out, or `cancel` fires.
///
/// `op` receives the 1-based attempt number. `label` only appears in logs.
///
/// # Errors
///
/// - [`Error::Cancelled`] if the token is cancelled before an attempt starts
/// - [`Error::CancelledDuringBackoff`] if it fires while sleeping between attempts
/// - [`Error::RetriesExhausted`] carrying the final attempt's error otherwise
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    label: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts();
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        if cancel.is_cancelled() {
            warn!(label, attempt, "cancelled before attempt");
            return Err(Error::Cancelled);
        }

        if attempt > 1 {
            info!(label, attempt, max_attempts, "retrying");
        }

        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    info!(label, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            // A cancelled attempt is not a failure worth retrying
            Err(e) if e.is_cancellation() => return Err(e),
            Err(e) => {
                if attempt < max_attempts {
                    let backoff = policy.backoff_for(attempt);
                    warn!(label, attempt, ?backoff, error = %e, "attempt failed, backing off");

                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = cancel.cancelled() => {
                            warn!(label, attempt, "cancelled during backoff");
                            return Err(Error::CancelledDuringBackoff);
                        }
                    }
                } else {
                    warn!(label, attempt, error = %e, "final attempt failed");
                }
                last_error = Some(e);
            }
        }
    }

    let last = last_error.unwrap_or(Error::Cancelled);
    Err(Error::RetriesExhausted {
        attempts: max_attempts,
        last: Box::new(last),
    })
}
