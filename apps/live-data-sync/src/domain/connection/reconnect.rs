//! Reconnection Policy
//!
//! Exponential backoff with a bounded number of attempts. Delays are exact
//! (no jitter) and uncapped: the attempt count is the only bound.

use std::time::Duration;

/// Configuration for reconnection behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each attempt.
    pub multiplier: f64,
    /// Maximum consecutive reconnection attempts (0 disables reconnection).
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    /// `2^n` seconds before attempt `n`, five attempts.
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            multiplier: 2.0,
            max_attempts: 5,
        }
    }
}

impl ReconnectConfig {
    /// Create a new configuration with custom values.
    #[must_use]
    pub const fn new(initial_delay: Duration, multiplier: f64, max_attempts: u32) -> Self {
        Self {
            initial_delay,
            multiplier,
            max_attempts,
        }
    }
}

/// Attempt counter and next delay for one push session.
///
/// # Example
///
/// ```rust
/// use live_data_sync::domain::connection::{ReconnectConfig, ReconnectPolicy};
/// use std::time::Duration;
///
/// let mut policy = ReconnectPolicy::new(ReconnectConfig::default());
/// assert_eq!(policy.next_delay(), Some(Duration::from_secs(2)));
/// assert_eq!(policy.next_delay(), Some(Duration::from_secs(4)));
///
/// // Connection opened
/// policy.reset();
/// assert_eq!(policy.attempt_count(), 0);
/// ```
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    current_delay: Duration,
    attempt_count: u32,
}

impl ReconnectPolicy {
    /// Create a new reconnection policy.
    #[must_use]
    pub const fn new(config: ReconnectConfig) -> Self {
        let initial_delay = config.initial_delay;
        Self {
            config,
            current_delay: initial_delay,
            attempt_count: 0,
        }
    }

    /// Delay before the next attempt, counting that attempt.
    ///
    /// Returns `None` once `max_attempts` consecutive attempts have been used.
    #[must_use]
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt_count >= self.config.max_attempts {
            return None;
        }

        self.attempt_count += 1;
        let delay = self.current_delay;

        #[allow(clippy::cast_precision_loss)]
        let scaled = (self.current_delay.as_millis() as f64 * self.config.multiplier).round();
        let next_millis = if scaled.is_finite() && scaled > 0.0 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                scaled as u128
            }
        } else {
            0
        };
        self.current_delay = Duration::from_millis(u64::try_from(next_millis).unwrap_or(u64::MAX));

        Some(delay)
    }

    /// Reset after a connection opens.
    pub const fn reset(&mut self) {
        self.current_delay = self.config.initial_delay;
        self.attempt_count = 0;
    }

    /// Attempts used since the last reset.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Configured attempt bound.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test]
    fn default_config_values() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(2));
        assert!((config.multiplier - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.max_attempts, 5);
    }

    #[test_case(1, 2)]
    #[test_case(2, 4)]
    #[test_case(3, 8)]
    #[test_case(4, 16)]
    #[test_case(5, 32)]
    fn delay_before_attempt_n_is_two_to_the_n(attempt: u32, secs: u64) {
        let mut policy = ReconnectPolicy::new(ReconnectConfig::default());
        let mut delay = None;
        for _ in 0..attempt {
            delay = policy.next_delay();
        }
        assert_eq!(delay, Some(Duration::from_secs(secs)));
        assert_eq!(policy.attempt_count(), attempt);
    }

    #[test]
    fn sixth_attempt_is_refused() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig::default());
        for _ in 0..5 {
            assert!(policy.next_delay().is_some());
        }
        assert!(policy.next_delay().is_none());
        assert!(policy.next_delay().is_none());
        assert_eq!(policy.attempt_count(), 5);
    }

    #[test]
    fn reset_restarts_backoff() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig::default());
        let _ = policy.next_delay();
        let _ = policy.next_delay();
        let _ = policy.next_delay();

        policy.reset();

        assert_eq!(policy.attempt_count(), 0);
        assert_eq!(policy.next_delay(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn zero_attempts_never_retries() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig::new(
            Duration::from_millis(100),
            2.0,
            0,
        ));
        assert!(policy.next_delay().is_none());
        assert_eq!(policy.attempt_count(), 0);
    }

    #[test]
    fn delays_are_not_capped() {
        let mut policy =
            ReconnectPolicy::new(ReconnectConfig::new(Duration::from_secs(60), 10.0, 3));
        let _ = policy.next_delay();
        let _ = policy.next_delay();
        assert_eq!(policy.next_delay(), Some(Duration::from_secs(6000)));
    }

    proptest! {
        /// `true` = the attempt opened a connection, `false` = it failed.
        #[test]
        fn consecutive_attempts_never_exceed_bound(
            max_attempts in 0u32..8,
            outcomes in proptest::collection::vec(any::<bool>(), 0..64),
        ) {
            let mut policy = ReconnectPolicy::new(ReconnectConfig::new(
                Duration::from_millis(10),
                2.0,
                max_attempts,
            ));
            let mut consecutive = 0u32;

            for opened in outcomes {
                if opened {
                    policy.reset();
                    consecutive = 0;
                    continue;
                }
                match policy.next_delay() {
                    Some(_) => consecutive += 1,
                    None => prop_assert_eq!(consecutive, max_attempts),
                }
                prop_assert!(consecutive <= max_attempts);
                prop_assert_eq!(policy.attempt_count(), consecutive);
            }
        }
    }
}
