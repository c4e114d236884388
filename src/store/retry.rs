//! Bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{EngineError, EngineResult};

use super::StoreError;

/// How store calls are retried when the store is unavailable.
///
/// Only [`StoreError::Unavailable`] is retried. A precondition conflict is
/// returned immediately as [`EngineError::WriteConflict`] for the caller to
/// resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A policy that retries immediately, for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// The delay before retry number `retry` (zero-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Runs `op` until it succeeds, fails permanently, runs out of attempts,
    /// or `cancel` fires.
    ///
    /// # Arguments
    ///
    /// * `operation` - Name used in logs and error messages
    /// * `cancel` - Aborts the retry loop, including any pending backoff
    /// * `op` - Produces a fresh attempt each time it is called
    ///
    /// # Returns
    ///
    /// The first successful result, or:
    /// - `EngineError::WriteConflict` on a precondition failure
    /// - `EngineError::Persistence` once attempts are exhausted
    /// - `EngineError::Cancelled` if the token fires
    pub async fn run<T, F, Fut>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> EngineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let max_attempts = self.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled {
                    operation: operation.to_string(),
                });
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(StoreError::Conflict { key }) => return Err(EngineError::WriteConflict { key }),
                Err(StoreError::Unavailable { message }) if attempt < max_attempts => {
                    let delay = self.delay_for(attempt - 1);
                    warn!(
                        operation = operation,
                        attempt = attempt,
                        max_attempts = max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Store unavailable, retrying: {message}"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            return Err(EngineError::Cancelled {
                                operation: operation.to_string(),
                            });
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(StoreError::Unavailable { message }) => {
                    return Err(EngineError::Persistence {
                        message: format!(
                            "{operation} failed after {max_attempts} attempts: {message}"
                        ),
                    });
                }
            }
        }

        Err(EngineError::Persistence {
            message: format!("{operation} was not attempted"),
        })
    }
}
