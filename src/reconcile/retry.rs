//! Bounded retry policy for balance-index pagination.

use std::time::Duration;

/// Exponential backoff with a hard attempt bound.
///
/// Reconciliation keeps a job queued when a page fetch keeps failing
/// instead of retrying forever, so a degraded balance index cannot pin a
/// worker slot indefinitely.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum fetch attempts per page, first try included.
    pub max_attempts: u32,

    /// Backoff before the second attempt.
    pub initial_backoff: Duration,

    /// Backoff growth factor per attempt.
    pub backoff_multiplier: f64,

    /// Backoff ceiling.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Returns the backoff before retry number `attempt` (1-based: the
    /// first retry waits `initial_backoff`).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let factor = self.backoff_multiplier.powi(exponent as i32);
        self.initial_backoff.mul_f64(factor).min(self.max_backoff)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grows_exponentially() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(1), Duration::from_millis(500));
        assert_eq!(policy.delay(2), Duration::from_millis(1000));
        assert_eq!(policy.delay(3), Duration::from_millis(2000));
    }

    #[test]
    fn test_delay_respects_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(10), Duration::from_secs(10));
        assert_eq!(policy.delay(31), Duration::from_secs(10));
    }

    #[test]
    fn test_custom_multiplier() {
        let policy = RetryPolicy {
            backoff_multiplier: 3.0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay(2), Duration::from_millis(1500));
    }
}
