use std::time::Duration;

use crate::types::constants::{BACKOFF_BASE, BACKOFF_CAP, MAX_RETRIES};

/// Bounded exponential backoff: `min(base * 2^retry, cap)` for at most
/// `max_retries` consecutive attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub max_retries: u32,
}

impl ReconnectPolicy {
    pub fn new(base: Duration, cap: Duration, max_retries: u32) -> Self {
        Self {
            base,
            cap,
            max_retries,
        }
    }

    /// Delay before the reconnect that follows `retry_count` previous retries
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        2u32.checked_pow(retry_count)
            .map(|factor| self.base.saturating_mul(factor))
            .unwrap_or(self.cap)
            .min(self.cap)
    }

    pub fn should_retry(&self, retry_count: u32) -> bool {
        retry_count < self.max_retries
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(BACKOFF_BASE),
            Duration::from_millis(BACKOFF_CAP),
            MAX_RETRIES,
        )
    }
}

/// Retry counter driven by a [`ReconnectPolicy`]
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    attempts: u32,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    /// Number of retries scheduled since the last successful open
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Next delay, or `None` once the ceiling is reached
    pub fn next_delay(&mut self) -> Option<Duration> {
        if !self.policy.should_retry(self.attempts) {
            return None;
        }
        let delay = self.policy.delay_for(self.attempts);
        self.attempts += 1;
        Some(delay)
    }

    /// Reset after a successful open
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff() {
        let policy = ReconnectPolicy::new(Duration::from_secs(1), Duration::from_secs(10), 5);

        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        // Should cap at max
        assert_eq!(policy.delay_for(4), Duration::from_secs(10));
        assert_eq!(policy.delay_for(40), Duration::from_secs(10));
    }

    #[test]
    fn test_delays_are_non_decreasing_and_capped() {
        let policy = ReconnectPolicy::new(Duration::from_millis(300), Duration::from_secs(5), 12);
        let mut backoff = Backoff::new(policy);

        let delays: Vec<Duration> = std::iter::from_fn(|| backoff.next_delay()).collect();
        assert_eq!(delays.len(), 12);
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert!(delays.iter().all(|d| *d <= Duration::from_secs(5)));
    }

    #[test]
    fn test_ceiling_and_reset() {
        let mut backoff = Backoff::new(ReconnectPolicy::default());

        for _ in 0..MAX_RETRIES {
            assert!(backoff.next_delay().is_some());
        }
        assert_eq!(backoff.attempts(), MAX_RETRIES);
        assert!(backoff.next_delay().is_none());

        backoff.reset();
        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(BACKOFF_BASE)));
    }

    #[test]
    fn test_zero_retries_never_retries() {
        let mut backoff = Backoff::new(ReconnectPolicy::new(
            Duration::from_secs(1),
            Duration::from_secs(1),
            0,
        ));
        assert!(backoff.next_delay().is_none());
    }
}
