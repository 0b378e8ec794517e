use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

pub const DEFAULT_MIN_INTERVAL_MS: u64 = 200;

#[derive(Debug)]
/// Fixed-spacing throttle for outbound execution calls.
///
/// Every grant happens at least `min_interval` after the previous grant. Idle
/// time earns no burst credit. The wait runs while holding the state lock, so
/// concurrent callers queue up and observe the same spacing.
pub struct RateLimiter {
    min_interval: Duration,
    last_granted: Mutex<Option<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_MIN_INTERVAL_MS))
    }
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_granted: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until the spacing since the previous grant has elapsed, then record
    /// and return this grant's instant. The first call returns immediately.
    pub async fn acquire(&self) -> Instant {
        let mut last_granted = self.last_granted.lock().await;
        if let Some(previous) = *last_granted {
            let ready_at = previous + self.min_interval;
            if Instant::now() < ready_at {
                tracing::trace!(
                    wait_ms = ready_at.saturating_duration_since(Instant::now()).as_millis() as u64,
                    "execution rate limiter waiting"
                );
                sleep_until(ready_at).await;
            }
        }
        let granted = Instant::now();
        *last_granted = Some(granted);
        granted
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::time::Instant;

    use super::{RateLimiter, DEFAULT_MIN_INTERVAL_MS};

    #[tokio::test]
    async fn unit_first_acquire_returns_immediately() {
        let limiter = RateLimiter::new(Duration::from_millis(500));
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(250));
    }

    #[tokio::test]
    async fn functional_back_to_back_acquires_are_spaced_by_min_interval() {
        let interval = Duration::from_millis(40);
        let limiter = RateLimiter::new(interval);
        let mut grants = Vec::new();
        for _ in 0..4 {
            grants.push(limiter.acquire().await);
        }
        for pair in grants.windows(2) {
            assert!(
                pair[1].duration_since(pair[0]) >= interval,
                "grants should be at least {interval:?} apart"
            );
        }
    }

    #[tokio::test]
    async fn integration_concurrent_callers_still_observe_spacing() {
        let interval = Duration::from_millis(30);
        let limiter = Arc::new(RateLimiter::new(interval));
        let start = Instant::now();
        let mut handles = Vec::new();
        for _ in 0..3 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
            }));
        }
        for handle in handles {
            handle.await.expect("join");
        }
        assert!(
            start.elapsed() >= interval * 2,
            "three grants need at least two full intervals"
        );
    }

    #[tokio::test]
    async fn regression_idle_time_does_not_accumulate_burst_credit() {
        let interval = Duration::from_millis(30);
        let limiter = RateLimiter::new(interval);
        limiter.acquire().await;
        tokio::time::sleep(interval * 3).await;

        let after_idle = limiter.acquire().await;
        let next = limiter.acquire().await;
        assert!(next.duration_since(after_idle) >= interval);
        assert_eq!(
            RateLimiter::default().min_interval(),
            Duration::from_millis(DEFAULT_MIN_INTERVAL_MS)
        );
    }
}
