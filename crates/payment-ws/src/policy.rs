//! How long to wait between connection attempts, and whether to give up.
//!
//! The default is a fixed 5 second delay with no attempt limit: the client
//! retries forever until it is cancelled. Exponential growth and an attempt cap
//! are opt-in.

use std::time::Duration;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed,
    /// Doubles per consecutive failure, capped at the given maximum.
    Exponential { max: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    delay: Duration,
    backoff: Backoff,
    max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RECONNECT_DELAY)
    }
}

impl ReconnectPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            backoff: Backoff::Fixed,
            max_attempts: None,
        }
    }

    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self {
            delay: initial,
            backoff: Backoff::Exponential {
                max: max.max(initial),
            },
            max_attempts: None,
        }
    }

    /// Stop after `attempts` consecutive failed attempts. Zero is treated as one.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts.max(1));
        self
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Delay before the next attempt after `consecutive_failures` failures (1-based).
    pub fn delay_for(&self, consecutive_failures: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { max } => {
                let exponent = consecutive_failures.saturating_sub(1);
                let factor = 2u32.saturating_pow(exponent);
                self.delay.saturating_mul(factor).min(max)
            }
        }
    }

    pub fn is_exhausted(&self, consecutive_failures: u32) -> bool {
        self.max_attempts
            .is_some_and(|max| consecutive_failures >= max)
    }
}
