use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded exponential backoff shared by the signaling channel and peer links.
///
/// Attempt `n` (zero based) waits `base_delay * 2^n`, capped at `max_delay`.
/// After `max_attempts` attempts the caller gives up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackoffPolicy {
    #[serde(rename = "baseDelayMs", with = "crate::model::duration_ms")]
    pub base_delay: Duration,
    #[serde(rename = "maxDelayMs", with = "crate::model::duration_ms")]
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl BackoffPolicy {
    pub const fn new(base_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            max_attempts,
        }
    }

    /// Delay to wait before attempt `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }

    /// The full delay schedule, one entry per allowed attempt.
    pub fn delays(self) -> impl Iterator<Item = Duration> {
        (0..self.max_attempts).map(move |attempt| self.delay_for(attempt))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30), 5)
    }
}
