//! Optional cap on session create rate

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use std::num::NonZeroU32;

/// Token-bucket limiter for session creates, via the governor crate
///
/// Applied before every create, on top of the batch stagger. Disabled when no
/// rate is configured.
pub struct CreateRateLimiter {
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    rate_limit: Option<f64>,
}

impl CreateRateLimiter {
    /// Create a limiter for `rate_limit` creates per second; `None` disables it
    ///
    /// Sub-1 rates round up to 1 per second.
    pub fn new(rate_limit: Option<f64>) -> Self {
        let limiter = rate_limit.and_then(|rps| {
            if rps <= 0.0 {
                return None;
            }
            let rps_int = (rps.ceil() as u32).max(1);
            let quota = Quota::per_second(NonZeroU32::new(rps_int)?);
            Some(RateLimiter::direct(quota))
        });

        Self {
            limiter,
            rate_limit,
        }
    }

    /// A limiter that never waits
    pub fn unlimited() -> Self {
        Self::new(None)
    }

    /// Wait until the next create is allowed
    pub async fn wait(&self) {
        if let Some(ref limiter) = self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Check if rate limiting is enabled
    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Configured creates per second
    pub fn rate_limit(&self) -> Option<f64> {
        self.rate_limit
    }
}

impl Default for CreateRateLimiter {
    fn default() -> Self {
        Self::new(None)
    }
}

impl std::fmt::Debug for CreateRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateRateLimiter")
            .field("rate_limit", &self.rate_limit)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_disabled() {
        let limiter = CreateRateLimiter::new(None);
        assert!(!limiter.is_enabled());
        assert!(limiter.rate_limit().is_none());
    }

    #[test]
    fn test_rate_limiter_non_positive_rps() {
        assert!(!CreateRateLimiter::new(Some(0.0)).is_enabled());
        assert!(!CreateRateLimiter::new(Some(-10.0)).is_enabled());
    }

    #[test]
    fn test_rate_limiter_enabled() {
        let limiter = CreateRateLimiter::new(Some(25.0));
        assert!(limiter.is_enabled());
        assert_eq!(limiter.rate_limit(), Some(25.0));
    }

    #[tokio::test]
    async fn test_rate_limiter_first_wait_is_immediate() {
        CreateRateLimiter::unlimited().wait().await;
        CreateRateLimiter::new(Some(1000.0)).wait().await;
    }

    #[test]
    fn test_rate_limiter_debug() {
        let debug = format!("{:?}", CreateRateLimiter::new(Some(5.0)));
        assert!(debug.contains("CreateRateLimiter"));
        assert!(debug.contains("5.0"));
    }
}
