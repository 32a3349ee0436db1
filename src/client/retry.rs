//! Retry policy for prediction calls: attempt budget and backoff.

use std::time::Duration;

/// Delay applied between two attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same pause before every retry (zero = immediate)
    Fixed(Duration),
    /// Doubles after each failed attempt, capped at `max`
    Exponential { initial: Duration, max: Duration },
}

/// Retry budget for a network call, decoupled from the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed(delay),
        }
    }

    /// Immediate retries, no pause.
    pub fn immediate(max_retries: u32) -> Self {
        Self::fixed(max_retries, Duration::ZERO)
    }

    pub fn exponential(max_retries: u32, initial: Duration, max: Duration) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Exponential { initial, max },
        }
    }

    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Pause before attempt number `attempt` (0-based). The first attempt never waits.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { initial, max } => {
                let factor = 2u32.saturating_pow(attempt - 1);
                std::cmp::min(initial.saturating_mul(factor), max)
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::immediate(1)
    }
}
