//! Exponential backoff around destination operations.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::storage::DestinationResult;

/// How destination operations are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            base_delay_ms: 1_000,
            max_delay_ms: 64_000,
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Delay before retry number `retry` (0-based).
    ///
    /// Doubles from the base up to the cap, then shifts by 10%: down on even
    /// retries, up on odd ones.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
        let delay = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        let jitter = delay / 10;
        let ms = if retry % 2 == 0 {
            delay - jitter
        } else {
            delay + jitter
        };
        Duration::from_millis(ms)
    }

    /// Run `op`, retrying transient failures.
    ///
    /// `context` names what the operation was writing (note ids, file name)
    /// and is only rendered when the operation finally fails.
    ///
    /// # Errors
    ///
    /// Returns `Error::PermanentWrite` on the first permanent failure and
    /// `Error::TransientWrite` once every attempt failed transiently.
    pub fn run<T>(
        &self,
        operation: &str,
        context: impl Fn() -> String,
        mut op: impl FnMut() -> DestinationResult<T>,
    ) -> Result<T> {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => {
                    return Err(Error::PermanentWrite {
                        operation: operation.to_string(),
                        context: context(),
                        message: err.message,
                    });
                }
                Err(err) if attempt >= max_attempts => {
                    return Err(Error::TransientWrite {
                        operation: operation.to_string(),
                        context: context(),
                        message: err.message,
                        attempts: attempt,
                    });
                }
                Err(err) => {
                    let delay = self.delay_for(attempt - 1);
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "transient destination failure, retrying"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}
