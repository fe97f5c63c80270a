//! Cooldown-style rate limiting for periodic background work.
//!
//! [`RateLimiter`] grants at most one token per configured period. Callers
//! either poll with [`RateLimiter::try_take`] or park in
//! [`RateLimiter::wait`], which retries with exponential backoff and gives
//! up quietly when cancelled.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

// ─────────────────────────────────────────────────────────────────────────────
// Backoff calculation
// ─────────────────────────────────────────────────────────────────────────────

/// Backoff delay before retry `attempt` (zero-based).
///
/// Formula: `period * 2^attempt`, shift-based and saturating, so very high
/// attempt counts cap at `Duration::MAX` instead of overflowing.
#[must_use]
pub fn backoff_delay(period: Duration, attempt: u32) -> Duration {
    period.saturating_mul(1u32 << attempt.min(31))
}

// ─────────────────────────────────────────────────────────────────────────────
// RateLimiter
// ─────────────────────────────────────────────────────────────────────────────

/// Grants at most one token per configured period.
///
/// The grant instant is recorded atomically under a mutex, so concurrent
/// callers race for a single token per period.
pub struct RateLimiter {
    period: Duration,
    last_take: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter that grants one token per `period`.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_take: Mutex::new(None),
        }
    }

    /// The configured period.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Take the token if the period has elapsed since the last grant.
    ///
    /// The first call always succeeds. On success the grant instant is
    /// recorded before the lock is released.
    pub fn try_take(&self) -> bool {
        let mut last = self.last_take.lock();
        let now = Instant::now();
        match *last {
            Some(prev) if now.duration_since(prev) < self.period => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    /// Wait until a token is granted, backing off exponentially.
    ///
    /// Sleeps [`backoff_delay`]`(period, attempt)` between failed tries
    /// (period, 2x period, 4x period, ...). Returns `false` without error if
    /// `cancel` fires during a backoff sleep — the caller gave up, nothing
    /// went wrong.
    pub async fn wait(&self, cancel: &CancellationToken) -> bool {
        let mut attempt = 0u32;
        loop {
            if self.try_take() {
                return true;
            }
            let delay = backoff_delay(self.period, attempt);
            tokio::select! {
                () = cancel.cancelled() => return false,
                () = tokio::time::sleep(delay) => {}
            }
            attempt = attempt.saturating_add(1);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::time::advance;

    use super::*;

    // -- backoff_delay --

    #[test]
    fn backoff_doubles_per_attempt() {
        let period = Duration::from_secs(1);
        assert_eq!(backoff_delay(period, 0), Duration::from_secs(1));
        assert_eq!(backoff_delay(period, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(period, 2), Duration::from_secs(4));
        assert_eq!(backoff_delay(period, 3), Duration::from_secs(8));
    }

    #[test]
    fn backoff_high_attempt_no_overflow() {
        // Should not panic with very high attempt numbers.
        let delay = backoff_delay(Duration::from_secs(60), 100);
        assert!(delay >= Duration::from_secs(60));
    }

    // -- try_take --

    #[tokio::test(start_paused = true)]
    async fn first_take_succeeds() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        assert!(limiter.try_take());
    }

    #[tokio::test(start_paused = true)]
    async fn second_take_within_period_is_limited() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        assert!(limiter.try_take());
        advance(Duration::from_millis(100)).await;
        assert!(!limiter.try_take());
    }

    #[tokio::test(start_paused = true)]
    async fn take_succeeds_once_period_elapses() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        assert!(limiter.try_take()); // t = 0
        advance(Duration::from_millis(100)).await;
        assert!(!limiter.try_take()); // t = 0.1s
        advance(Duration::from_secs(1)).await;
        assert!(limiter.try_take()); // t = 1.1s
    }

    #[tokio::test(start_paused = true)]
    async fn grant_restarts_the_period() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        assert!(limiter.try_take());
        advance(Duration::from_secs(1)).await;
        assert!(limiter.try_take());
        advance(Duration::from_millis(900)).await;
        // Only 0.9s since the second grant.
        assert!(!limiter.try_take());
    }

    // -- wait --

    #[tokio::test(start_paused = true)]
    async fn wait_returns_immediately_when_token_free() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        let cancel = CancellationToken::new();
        assert!(limiter.wait(&cancel).await);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_sleeps_one_period_then_takes() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        let cancel = CancellationToken::new();
        assert!(limiter.try_take());

        let start = Instant::now();
        assert!(limiter.wait(&cancel).await);
        // One backoff sleep of exactly the period clears the cooldown.
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_gives_up_on_cancellation() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(60)));
        let cancel = CancellationToken::new();
        assert!(limiter.try_take());

        let waiter = {
            let limiter = Arc::clone(&limiter);
            let cancel = cancel.clone();
            tokio::spawn(async move { limiter.wait(&cancel).await })
        };

        // Let the waiter enter its backoff sleep, then cancel it.
        tokio::task::yield_now().await;
        cancel.cancel();
        assert!(!waiter.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_wait_does_not_consume_the_token() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        let cancel = CancellationToken::new();
        assert!(limiter.try_take());
        cancel.cancel();
        assert!(!limiter.wait(&cancel).await);

        // The cooldown still expires on schedule for the next caller.
        advance(Duration::from_secs(1)).await;
        assert!(limiter.try_take());
    }
}
