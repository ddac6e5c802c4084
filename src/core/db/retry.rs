/// Connection Retry Module
///
/// Backoff schedule and sleeping strategy used while establishing the
/// connection.

use std::time::Duration;

/// Exponential backoff: attempt `n` waits `2^n` units.
///
/// There is no cap and no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    unit: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff {
            unit: Duration::from_secs(1),
        }
    }
}

impl Backoff {
    /// Backoff counted in seconds
    pub fn new() -> Self {
        Self::default()
    }

    /// Backoff counted in an arbitrary unit
    pub fn with_unit(unit: Duration) -> Self {
        Backoff { unit }
    }

    pub fn unit(&self) -> Duration {
        self.unit
    }

    /// Delay after failed attempt `attempt` (1-indexed)
    pub fn delay(&self, attempt: u32) -> Duration {
        let multiplier = 1u32.checked_shl(attempt).unwrap_or(0);
        if multiplier == 0 {
            return Duration::MAX;
        }
        self.unit.saturating_mul(multiplier)
    }
}

/// Blocks the current thread between attempts
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeps with `std::thread::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
