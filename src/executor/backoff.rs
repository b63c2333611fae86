//! Retry policy for buy submission
//!
//! Bounded exponential backoff with jitter. The wait after the n-th failure
//! is `min_timeout * 2^(n-1) * jitter` with jitter drawn from [1, 2), then
//! clamped to [min_timeout, max_timeout].

use rand::Rng;
use std::time::Duration;

use crate::config::SniperConfig;

/// Exponent cap; 2^30 * any sane min_timeout is already past max_timeout
const MAX_EXPONENT: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait before the first attempt
    pub buy_delay: Duration,
    /// Retries after the first attempt (total attempts = max_retries + 1)
    pub max_retries: u32,
    pub min_timeout: Duration,
    pub max_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &SniperConfig) -> Self {
        Self {
            buy_delay: config.buy_delay,
            max_retries: config.buy_retries,
            min_timeout: config.retry_min_timeout,
            max_timeout: config.retry_max_timeout,
        }
    }

    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Deterministic backoff after failure number `failed` (1-based)
    pub fn backoff(&self, failed: u32, jitter: f64) -> Duration {
        let exponent = failed.saturating_sub(1).min(MAX_EXPONENT);
        let jitter = if jitter.is_finite() { jitter.clamp(1.0, 2.0) } else { 1.0 };
        let secs = self.min_timeout.as_secs_f64() * f64::from(1u32 << exponent) * jitter;

        let wait = Duration::from_secs_f64(secs.min(self.max_timeout.as_secs_f64()));
        wait.max(self.min_timeout).min(self.max_timeout)
    }

    /// Backoff with fresh random jitter
    pub fn next_delay(&self, failed: u32) -> Duration {
        let jitter = rand::thread_rng().gen_range(1.0..2.0);
        self.backoff(failed, jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            buy_delay: Duration::from_secs(1),
            max_retries: 3,
            min_timeout: Duration::from_millis(250),
            max_timeout: Duration::from_millis(3000),
        }
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        let p = policy();
        assert_eq!(p.backoff(1, 1.0), Duration::from_millis(250));
        assert_eq!(p.backoff(2, 1.0), Duration::from_millis(500));
        assert_eq!(p.backoff(3, 1.0), Duration::from_millis(1000));
        assert_eq!(p.backoff(4, 1.0), Duration::from_millis(2000));
        assert_eq!(p.backoff(5, 1.0), Duration::from_millis(3000));
        assert_eq!(p.backoff(40, 1.9), Duration::from_millis(3000));
    }

    #[test]
    fn test_jitter_is_clamped() {
        let p = policy();
        assert_eq!(p.backoff(1, 0.1), Duration::from_millis(250));
        assert_eq!(p.backoff(1, 7.0), Duration::from_millis(500));
        assert_eq!(p.backoff(1, f64::NAN), Duration::from_millis(250));
    }

    #[test]
    fn test_random_delay_within_bounds() {
        let p = policy();
        for failed in 1..=10 {
            let d = p.next_delay(failed);
            assert!(d >= p.min_timeout && d <= p.max_timeout, "{:?}", d);
        }
    }

    #[test]
    fn test_total_attempts() {
        assert_eq!(policy().total_attempts(), 4);
        let p = RetryPolicy {
            max_retries: 1,
            ..policy()
        };
        assert_eq!(p.total_attempts(), 2);
    }
}
