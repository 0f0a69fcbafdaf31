//! Exponential backoff for (re)connecting to the broker.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Capped exponential backoff.
///
/// Attempt `n` (zero based) waits `initial_backoff_ms * multiplier^n`,
/// clamped to `max_backoff_ms`. After `max_attempts` failed attempts the
/// caller gives up and reports the connection as lost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 300,
            max_backoff_ms: 30_000,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy with a single attempt and no waiting.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
            multiplier: 1.0,
        }
    }

    /// Delay to wait after failed attempt `attempt` (zero based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(63) as i32);
        let millis = (self.initial_backoff_ms as f64 * factor).min(self.max_backoff_ms as f64);
        Duration::from_millis(millis as u64)
    }

    /// Run `op` until it succeeds or the attempts run out.
    ///
    /// Sleeps between attempts, never after the last one. Returns the last
    /// error together with the number of attempts made.
    pub fn run<T, E>(&self, mut op: impl FnMut(u32) -> Result<T, E>) -> Result<T, (E, u32)> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if attempt + 1 >= attempts => return Err((err, attempt + 1)),
                Err(_) => {
                    std::thread::sleep(self.backoff(attempt));
                    attempt += 1;
                }
            }
        }
    }
}
