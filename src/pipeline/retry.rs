//! Retry policy for gazette acquisition.
//!
//! Fixed interval between attempts, bounded attempt count.

use std::time::Duration;

/// Fixed-interval retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per run, including the first one. Never below 1.
    max_attempts: u32,
    /// Wait between a failed attempt and the next one.
    interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether another attempt follows a failed `attempt` (1-based).
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// How long to wait after a failed `attempt`, or `None` if it was the last.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        self.should_retry(attempt).then_some(self.interval)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(3600))
    }
}
