//! Bounded retry policy shared by the outbound HTTP clients.

use std::time::Duration;

/// Max attempts plus exponential backoff: `base_delay * 2^(attempt - 1)` before
/// each retry. Attempt numbering starts at 0 for the first call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay to wait before `attempt`, or `None` for the first attempt.
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 {
            return None;
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        Some(self.base_delay.saturating_mul(factor))
    }

    /// Sleeps for the backoff of `attempt` (no-op on the first attempt).
    pub async fn wait(&self, attempt: u32) {
        if let Some(delay) = self.delay_before(attempt) {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}
