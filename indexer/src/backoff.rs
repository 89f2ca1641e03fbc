/// Exponential backoff for RPC failures.

use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base_interval_secs: u64,
    max_interval_secs: u64,
    current_attempt: u32,
    current_interval_secs: u64,
}

impl ExponentialBackoff {
    pub fn new(base_interval_secs: u64, max_interval_secs: u64) -> Self {
        ExponentialBackoff {
            base_interval_secs,
            max_interval_secs,
            current_attempt: 0,
            current_interval_secs: base_interval_secs,
        }
    }

    /// Record a failure and return how long to wait before retrying.
    /// Interval doubles per attempt and is capped at the maximum.
    pub fn on_failure(&mut self, error_message: &str) -> Duration {
        self.current_attempt += 1;

        let next_interval = self
            .base_interval_secs
            .saturating_mul(2_u64.saturating_pow(self.current_attempt.saturating_sub(1)));
        self.current_interval_secs = next_interval.min(self.max_interval_secs);

        error!(
            attempt = self.current_attempt,
            interval_secs = self.current_interval_secs,
            error = error_message,
            "RPC failure: backing off before retry"
        );

        Duration::from_secs(self.current_interval_secs)
    }

    pub fn on_success(&mut self) {
        if self.current_attempt > 0 {
            info!(
                attempts = self.current_attempt,
                "RPC recovered, resetting backoff"
            );
        }
        self.current_attempt = 0;
        self.current_interval_secs = self.base_interval_secs;
    }

    pub fn attempts(&self) -> u32 {
        self.current_attempt
    }

    pub fn interval_secs(&self) -> u64 {
        self.current_interval_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_until_capped() {
        let mut backoff = ExponentialBackoff::new(1, 10);

        assert_eq!(backoff.on_failure("e").as_secs(), 1);
        assert_eq!(backoff.on_failure("e").as_secs(), 2);
        assert_eq!(backoff.on_failure("e").as_secs(), 4);
        assert_eq!(backoff.on_failure("e").as_secs(), 8);
        assert_eq!(backoff.on_failure("e").as_secs(), 10);
        assert_eq!(backoff.on_failure("e").as_secs(), 10);
    }

    #[test]
    fn resets_on_success() {
        let mut backoff = ExponentialBackoff::new(2, 60);

        backoff.on_failure("e");
        backoff.on_failure("e");
        assert_eq!(backoff.attempts(), 2);

        backoff.on_success();
        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.interval_secs(), 2);
    }
}
