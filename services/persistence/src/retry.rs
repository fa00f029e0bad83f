//! Retry with exponential backoff for store commits
//!
//! The matching worker wraps every commit in this policy: 5 attempts,
//! 100 ms initial backoff, doubling, capped at 5 s.

use std::fmt::Display;
use std::time::Duration;
use tracing::{error, warn};

/// Exponential-backoff retry policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Run `op`, retrying on error with exponential backoff. Returns
    /// the last error once attempts are exhausted.
    pub fn run<T, E, F>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Result<T, E>,
    {
        let mut backoff = self.initial_backoff;
        let mut attempt = 0;

        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        error!(
                            operation = label,
                            attempts = attempt,
                            error = %e,
                            "operation failed after retries"
                        );
                        return Err(e);
                    }
                    warn!(
                        operation = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "operation failed, retrying"
                    );
                    std::thread::sleep(backoff);
                    backoff = (backoff * 2).min(self.max_backoff);
                }
            }
        }
    }
}
