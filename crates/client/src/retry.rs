use std::time::Duration;

use datalift_protocol::constants::{
    DEFAULT_MAX_RETRIES, RETRY_BACKOFF_FACTOR, RETRY_BASE_DELAY, RETRY_MAX_DELAY,
};

/// Exponential backoff policy, shared by whole-payload sends and individual
/// chunk sends.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Backoff cap: no retry waits longer than this.
    pub max_delay: Duration,
    /// Delay multiplier per subsequent retry.
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: RETRY_BASE_DELAY,
            max_delay: RETRY_MAX_DELAY,
            backoff_factor: RETRY_BACKOFF_FACTOR,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): `base * factor^(attempt-1)`,
    /// capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63) as i32;
        let secs = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exp);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }
}
