//! Rate limiter for outbound Bot API messages.
//!
//! Spaces consecutive `sendMessage` calls so a large subscriber fan-out
//! stays under Telegram's flood limits.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

/// Rate limiter that enforces a minimum interval between operations.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum duration between allowed operations.
    min_interval: Duration,

    /// Last time an operation was performed.
    last_operation: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a new rate limiter with the specified minimum interval.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_operation: Mutex::new(None),
        }
    }

    /// Creates a rate limiter from milliseconds.
    #[must_use]
    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Waits until an operation is allowed, then marks it as performed.
    ///
    /// Returns the duration waited (zero if no wait was needed).
    pub async fn wait_and_acquire(&self) -> Duration {
        let mut last = self.last_operation.lock().await;

        let wait_duration = last
            .map(|last_time| self.min_interval.saturating_sub(last_time.elapsed()))
            .unwrap_or_default();

        if !wait_duration.is_zero() {
            debug!("Rate limiter: waiting {:?} before next send", wait_duration);
            tokio::time::sleep(wait_duration).await;
        }

        *last = Some(Instant::now());
        wait_duration
    }

    #[cfg(test)]
    async fn time_until_allowed(&self) -> Duration {
        let last = self.last_operation.lock().await;
        last.map(|last_time| self.min_interval.saturating_sub(last_time.elapsed()))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_first_operation() {
        let limiter = RateLimiter::from_millis(1000);
        assert_eq!(limiter.time_until_allowed().await, Duration::ZERO);

        let waited = limiter.wait_and_acquire().await;
        assert_eq!(waited, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_rate_limiter_subsequent_operation() {
        let limiter = RateLimiter::new(Duration::from_secs(60));

        limiter.wait_and_acquire().await;

        let remaining = limiter.time_until_allowed().await;
        assert!(remaining > Duration::ZERO);
        assert!(remaining <= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_zero_interval_never_waits() {
        let limiter = RateLimiter::from_millis(0);
        limiter.wait_and_acquire().await;
        assert_eq!(limiter.wait_and_acquire().await, Duration::ZERO);
    }
}
