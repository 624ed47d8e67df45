use std::time::Duration;

/// Retry policy for launches the OS refuses
///
/// Exits are never delayed; this only paces attempts to start an executable
/// that cannot currently be launched.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchRetryPolicy {
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Backoff strategy to use
    pub backoff_strategy: BackoffStrategy,
}

impl LaunchRetryPolicy {
    /// Create a retry policy with default values
    pub fn new() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            backoff_strategy: BackoffStrategy::Exponential {
                max_delay: Duration::from_secs(30),
            },
        }
    }

    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            backoff_strategy: BackoffStrategy::Fixed,
        }
    }

    /// Delay before the next attempt, given the failures seen since the last successful launch
    pub fn delay_after(&self, consecutive_failures: u32) -> Duration {
        self.backoff_strategy
            .calculate_delay(self.initial_delay, consecutive_failures.saturating_sub(1))
    }
}

impl Default for LaunchRetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Backoff strategy for retry delays
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackoffStrategy {
    /// Fixed delay between attempts
    Fixed,
    /// Exponential backoff with maximum delay
    Exponential { max_delay: Duration },
}

impl BackoffStrategy {
    /// Calculate the delay for a given retry attempt (0-based)
    pub fn calculate_delay(&self, initial_delay: Duration, attempt: u32) -> Duration {
        match self {
            BackoffStrategy::Fixed => initial_delay,
            BackoffStrategy::Exponential { max_delay } => {
                // delay = initial * 2^attempt
                let factor = 2_u32.saturating_pow(attempt);
                initial_delay
                    .checked_mul(factor)
                    .unwrap_or(*max_delay)
                    .min(*max_delay)
            }
        }
    }
}
