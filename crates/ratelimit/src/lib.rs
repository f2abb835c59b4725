//! Per-connector token-bucket rate limiting.
//!
//! Tokens refill at a constant rate (`requests_per_minute / 60` per
//! second), capped at `burst`. `wait` polls on an async
//! `tokio::time::sleep` loop rather than blocking an OS thread, since
//! the workspace is tokio-native throughout.

use cplane_config::{CatalogConfig, RateLimitSpec};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A single connector's token bucket. Thread-safe via internal locking.
pub struct RateLimiter {
    state: Mutex<BucketState>,
}

struct BucketState {
    tokens: f64,
    max_tokens: f64,
    refill_rate: f64,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32, burst: u32) -> Self {
        Self {
            state: Mutex::new(BucketState {
                tokens: burst as f64,
                max_tokens: burst as f64,
                refill_rate: requests_per_minute as f64 / 60.0,
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn from_spec(spec: &RateLimitSpec) -> Self {
        Self::new(spec.requests_per_minute, spec.burst)
    }

    fn refill(state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * state.refill_rate).min(state.max_tokens);
        state.last_refill = now;
    }

    /// Try to consume one token. Returns `true` if successful.
    pub fn acquire(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        Self::refill(&mut state);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Poll for a token until acquired or `timeout` elapses.
    pub async fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.acquire() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    pub fn available_tokens(&self) -> f64 {
        let mut state = self.state.lock().unwrap();
        Self::refill(&mut state);
        state.tokens
    }

    pub fn is_limited(&self) -> bool {
        self.available_tokens() < 1.0
    }
}

/// Per-connector registry, creating limiters lazily from the catalog's
/// default and per-connector rate limit config.
pub struct RateLimiterRegistry {
    default_spec: RateLimitSpec,
    per_connector: HashMap<String, RateLimitSpec>,
    limiters: Mutex<HashMap<String, std::sync::Arc<RateLimiter>>>,
}

impl RateLimiterRegistry {
    pub fn from_catalog(catalog: &CatalogConfig) -> Self {
        Self {
            default_spec: catalog.rate_limits.default.clone(),
            per_connector: catalog.rate_limits.per_connector.clone(),
            limiters: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_limiter(&self, connector_id: &str) -> std::sync::Arc<RateLimiter> {
        let mut limiters = self.limiters.lock().unwrap();
        limiters
            .entry(connector_id.to_string())
            .or_insert_with(|| {
                let spec = self
                    .per_connector
                    .get(connector_id)
                    .unwrap_or(&self.default_spec);
                std::sync::Arc::new(RateLimiter::from_spec(spec))
            })
            .clone()
    }

    pub fn check(&self, connector_id: &str) -> bool {
        self.get_limiter(connector_id).acquire()
    }

    pub async fn wait(&self, connector_id: &str, timeout: Duration) -> bool {
        self.get_limiter(connector_id).wait(timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_limit_then_deny() {
        let limiter = RateLimiter::new(60, 3);
        assert!(limiter.acquire());
        assert!(limiter.acquire());
        assert!(limiter.acquire());
        assert!(!limiter.acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn refills_fully_after_burst_over_refill_rate_elapsed() {
        let limiter = RateLimiter::new(600, 2); // 10 tokens/sec
        assert!(limiter.acquire());
        assert!(limiter.acquire());
        assert!(!limiter.acquire());

        tokio::time::advance(Duration::from_millis(250)).await;
        assert!(limiter.available_tokens() >= 2.0 - 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_succeeds_once_a_token_refills() {
        let limiter = RateLimiter::new(600, 1);
        assert!(limiter.acquire());
        assert!(!limiter.acquire());

        let waiter = tokio::spawn(async move { limiter.wait(Duration::from_secs(1)).await });
        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(waiter.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out_if_never_refilled() {
        let limiter = RateLimiter::new(0, 1);
        assert!(limiter.acquire());
        let waiter = tokio::spawn(async move { limiter.wait(Duration::from_millis(50)).await });
        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(!waiter.await.unwrap());
    }

    #[test]
    fn is_limited_reflects_bucket_state() {
        let limiter = RateLimiter::new(60, 1);
        assert!(!limiter.is_limited());
        limiter.acquire();
        assert!(limiter.is_limited());
    }

    #[test]
    fn registry_uses_per_connector_override() {
        let mut catalog = CatalogConfig::default();
        catalog.rate_limits.default.burst = 10;
        catalog
            .rate_limits
            .per_connector
            .insert("slack".into(), RateLimitSpec { requests_per_minute: 30, burst: 2 });

        let registry = RateLimiterRegistry::from_catalog(&catalog);
        let slack_limiter = registry.get_limiter("slack");
        assert!(slack_limiter.acquire());
        assert!(slack_limiter.acquire());
        assert!(!slack_limiter.acquire());

        let other_limiter = registry.get_limiter("discord");
        for _ in 0..10 {
            assert!(other_limiter.acquire());
        }
    }

    #[test]
    fn registry_reuses_limiter_instance_per_connector() {
        let catalog = CatalogConfig::default();
        let registry = RateLimiterRegistry::from_catalog(&catalog);
        registry.get_limiter("slack").acquire();
        let remaining = registry.get_limiter("slack").available_tokens();
        assert!(remaining < registry.default_spec.burst as f64);
    }
}
