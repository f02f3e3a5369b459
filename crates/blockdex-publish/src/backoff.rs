//! Exponential backoff between delivery attempts.

use std::time::Duration;

use blockdex_types::BackoffConfig;

/// `unit * 2^k`, capped at `max_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    unit: Duration,
    max_interval: Duration,
    max_attempts: Option<u32>,
}

impl BackoffPolicy {
    #[must_use]
    pub fn new(unit: Duration, max_interval: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            unit,
            max_interval,
            max_attempts,
        }
    }

    /// Wait before the retry that follows failed attempt number `failed`
    /// (1-based): 1, 2, 4, ... units.
    #[must_use]
    pub fn delay_after(&self, failed: u32) -> Duration {
        let exponent = failed.saturating_sub(1).min(31);
        self.unit
            .checked_mul(1u32 << exponent)
            .map_or(self.max_interval, |d| d.min(self.max_interval))
    }

    /// Whether `attempts` already used up the budget. Unbounded policies
    /// never exhaust.
    #[must_use]
    pub fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }

    #[must_use]
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }
}

impl From<&BackoffConfig> for BackoffPolicy {
    fn from(config: &BackoffConfig) -> Self {
        Self::new(
            Duration::from_millis(config.unit_ms),
            Duration::from_millis(config.max_interval_ms),
            config.max_attempts,
        )
    }
}
