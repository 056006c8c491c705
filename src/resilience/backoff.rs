//! Reconnect delay policy.

use rand::Rng;
use std::time::Duration;

use crate::config::{ReconnectConfig, ReconnectStrategy};

/// Chooses how long to wait before the next connection attempt.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    strategy: ReconnectStrategy,
    base_ms: u64,
    max_ms: u64,
}

impl ReconnectPolicy {
    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self {
            strategy: config.strategy,
            base_ms: config.delay_ms,
            max_ms: config.max_delay_ms,
        }
    }

    /// Always wait `delay`.
    pub fn fixed(delay: Duration) -> Self {
        let ms = delay.as_millis() as u64;
        Self {
            strategy: ReconnectStrategy::Fixed,
            base_ms: ms,
            max_ms: ms,
        }
    }

    /// Delay before attempt number `attempt` (1 = first retry after a drop).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.strategy {
            ReconnectStrategy::Fixed => Duration::from_millis(self.base_ms),
            ReconnectStrategy::Exponential => calculate_backoff(attempt.max(1), self.base_ms, self.max_ms),
        }
    }
}

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Jitter: 0 to 10% of the delay
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
