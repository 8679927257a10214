//! Bounded retry with exponential backoff for provider calls.
//!
//! Every provider call inside the simulation loop goes through
//! [`with_retry`], so the loop's suspension points are explicit and bounded:
//! at most `max_attempts` tries, each backoff sleep capped, never an
//! unbounded wait on a hung provider.

use super::provider::DataError;
use std::time::Duration;
use tracing::warn;

/// Retry policy: attempt count and backoff base.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps — for tests and pure in-memory providers.
    pub fn immediate() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::ZERO,
        }
    }

    /// Backoff before attempt `n` (1-based): base × 2^(n-1).
    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Run `call` up to `policy.max_attempts` times, backing off between
/// transient failures. Non-transient errors return immediately.
pub fn with_retry<T>(
    policy: &RetryPolicy,
    what: &str,
    mut call: impl FnMut() -> Result<T, DataError>,
) -> Result<T, DataError> {
    let mut attempt = 1;
    loop {
        match call() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(%what, %attempt, ?delay, error = %err, "provider call failed, retrying");
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
