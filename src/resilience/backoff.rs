//! Exponential backoff with jitter between origin connection attempts.

use rand::Rng;
use std::time::Duration;

use crate::config::TimeoutConfig;

/// Delay schedule for repeated connection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectBackoff {
    pub base_ms: u64,
    pub max_ms: u64,
}

impl ConnectBackoff {
    pub fn from_timeouts(timeouts: &TimeoutConfig) -> Self {
        Self {
            base_ms: timeouts.retry_base_delay_ms,
            max_ms: timeouts.retry_max_delay_ms,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let factor = 2u64.saturating_pow(attempt - 1);
        let capped = self.base_ms.saturating_mul(factor).min(self.max_ms);

        // Up to 10% jitter on top of the capped delay
        let jitter_range = capped / 10;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..jitter_range)
        } else {
            0
        };

        Duration::from_millis(capped + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grows_and_caps() {
        let backoff = ConnectBackoff { base_ms: 100, max_ms: 1000 };
        assert_eq!(backoff.delay(0), Duration::ZERO);

        let first = backoff.delay(1).as_millis();
        assert!((100..110).contains(&first));

        let second = backoff.delay(2).as_millis();
        assert!((200..220).contains(&second));

        let capped = backoff.delay(12).as_millis();
        assert!((1000..1100).contains(&capped));
    }

    #[test]
    fn test_zero_base_means_no_delay() {
        let backoff = ConnectBackoff { base_ms: 0, max_ms: 0 };
        assert_eq!(backoff.delay(3), Duration::ZERO);
    }
}
