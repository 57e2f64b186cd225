//! Client-side request pacing
//!
//! Uses the governor crate for token bucket rate limiting. Xero enforces a
//! per-minute call quota per tenant; pacing below it avoids minute-scoped 429s.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Configuration for request pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Maximum number of requests per minute
    pub requests_per_minute: u32,
    /// Burst size (max tokens in bucket)
    pub burst_size: u32,
}

impl RateLimiterConfig {
    /// Pace to `requests_per_minute`, allowing a burst of the same size
    pub fn per_minute(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
            burst_size: requests_per_minute,
        }
    }
}

/// Token bucket rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config
    pub fn new(config: &RateLimiterConfig) -> Self {
        let rate = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN);

        Self {
            limiter: Arc::new(Governor::direct(Quota::per_minute(rate).allow_burst(burst))),
        }
    }

    /// Wait until a request can be made
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish()
    }
}

#[cfg(test)]
mod rate_limit_tests {
    use super::*;

    impl RateLimiter {
        fn try_acquire(&self) -> bool {
            self.limiter.check().is_ok()
        }
    }

    #[test]
    fn test_per_minute_config() {
        let config = RateLimiterConfig::per_minute(60);
        assert_eq!(config.requests_per_minute, 60);
        assert_eq!(config.burst_size, 60);
    }

    #[test]
    fn test_burst_then_throttle() {
        let limiter = RateLimiter::new(&RateLimiterConfig {
            requests_per_minute: 60,
            burst_size: 3,
        });

        for _ in 0..3 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn test_zero_is_clamped_to_one() {
        let limiter = RateLimiter::new(&RateLimiterConfig::per_minute(0));
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_wait_within_burst() {
        let limiter = RateLimiter::new(&RateLimiterConfig::per_minute(600));
        limiter.wait().await;
    }
}
