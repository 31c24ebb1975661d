use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

/// Browser user agents rotated across requests; the portal sits behind
/// a CDN that is unfriendly to obvious non-browser clients.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
];

pub fn get_random_user_agent() -> &'static str {
    let mut rng = rand::rng();
    let index = rng.random_range(0..USER_AGENTS.len());
    USER_AGENTS[index]
}

/// Spacing between portal requests. A rate of zero disables the wait,
/// which keeps tests and local runs instant.
pub struct RateLimiter {
    delay: Duration,
}

impl RateLimiter {
    pub fn new(requests_per_second: f64) -> Self {
        let delay = if requests_per_second > 0.0 {
            Duration::from_millis((1000.0 / requests_per_second) as u64)
        } else {
            Duration::ZERO
        };
        Self { delay }
    }

    pub async fn wait(&self) {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_user_agent() {
        let agent = get_random_user_agent();
        assert!(!agent.is_empty());
        assert!(USER_AGENTS.contains(&agent));
    }

    #[test]
    fn test_rate_limiter_delay() {
        assert_eq!(RateLimiter::new(5.0).delay, Duration::from_millis(200));
        assert_eq!(RateLimiter::default().delay, Duration::from_millis(500));
        assert_eq!(RateLimiter::new(0.0).delay, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_disabled_rate_limiter_returns_immediately() {
        RateLimiter::new(0.0).wait().await;
    }
}
