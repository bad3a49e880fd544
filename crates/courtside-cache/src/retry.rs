//! Bounded retry with exponential backoff around a [`StatsProvider`].

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CacheError, CacheResult, ProviderError};
use crate::key::ResourceKey;
use crate::provider::StatsProvider;
use crate::types::Payload;

/// Result of one provider attempt.
pub type FetchOutcome = Result<Payload, ProviderError>;

/// Retry configuration. Stateless: nothing is shared between fetches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total provider calls allowed per fetch (at least 1).
    pub max_attempts: u32,

    /// Delay before the second attempt, in milliseconds.
    pub initial_backoff_ms: u64,

    /// Growth factor applied per further attempt.
    pub backoff_multiplier: f64,

    /// Ceiling for any single delay, in milliseconds.
    pub max_backoff_ms: u64,

    /// Random spread as a fraction of the delay (0.0 = deterministic).
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            backoff_multiplier: 2.0,
            max_backoff_ms: 30_000,
            jitter: 0.0,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff_ms = backoff.as_millis() as u64;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay after failed attempt number `attempt` (1-based):
    /// `initial * multiplier^(attempt-1)`, capped at `max_backoff`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let nanos = (self.initial_backoff_ms as f64 * 1e6) * self.backoff_multiplier.powi(exponent);
        let cap = self.max_backoff_ms as f64 * 1e6;
        Duration::from_nanos(nanos.min(cap).max(0.0).round() as u64)
    }

    /// Sum of every delay a fully failing fetch sleeps through.
    pub fn total_backoff(&self) -> Duration {
        (1..self.attempts()).map(|a| self.backoff_for(a)).sum()
    }

    fn delay_for(&self, attempt: u32, error: &ProviderError) -> Duration {
        let mut delay = self.backoff_for(attempt);

        if let ProviderError::RateLimited {
            retry_after: Some(retry_after),
        } = error
        {
            delay = delay.max(*retry_after);
        }

        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter > 0.0 {
            let factor: f64 = rand::thread_rng().gen_range((1.0 - jitter)..=(1.0 + jitter));
            delay = delay.mul_f64(factor);
        }

        delay.min(Duration::from_millis(self.max_backoff_ms))
    }
}

/// Provider wrapper that retries transient failures.
#[derive(Clone)]
pub struct RetryingFetcher {
    provider: Arc<dyn StatsProvider>,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    pub fn new(provider: Arc<dyn StatsProvider>, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Fetch `key`, retrying retryable failures.
    ///
    /// Issues at most `max_attempts` provider calls. Non-retryable failures
    /// (not found, unauthorized, undecodable) return immediately.
    pub async fn fetch(&self, key: &ResourceKey) -> CacheResult<Payload> {
        let max_attempts = self.policy.attempts();
        let mut attempt = 1;

        loop {
            debug!(key = %key, attempt, provider = self.provider_name(), "fetching upstream");

            match self.provider.fetch(key).await {
                Ok(payload) => return Ok(payload),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let backoff = self.policy.delay_for(attempt, &e);

                    warn!(
                        key = %key,
                        error = %e,
                        attempt,
                        max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        "retrying upstream fetch"
                    );

                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(CacheError::Fetch {
                        key: key.to_string(),
                        attempts: attempt,
                        source: e,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, ScriptedProvider};
    use tokio::time::Instant;

    fn network_error() -> ProviderError {
        ProviderError::Network {
            message: "HTTP 503: unavailable".into(),
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(3)
            .with_initial_backoff(Duration::from_millis(100))
            .with_multiplier(2.0)
    }

    #[test]
    fn test_backoff_is_geometric_and_capped() {
        let p = policy();
        assert_eq!(p.backoff_for(1), Duration::from_millis(100));
        assert_eq!(p.backoff_for(2), Duration::from_millis(200));
        assert_eq!(p.backoff_for(3), Duration::from_millis(400));
        assert_eq!(p.total_backoff(), Duration::from_millis(300));

        let capped = RetryPolicy {
            max_backoff_ms: 250,
            ..policy()
        };
        assert_eq!(capped.backoff_for(3), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_bounded_and_backoff_summed() {
        let provider = Arc::new(ScriptedProvider::failing(network_error()));
        let fetcher = RetryingFetcher::new(provider.clone(), policy());

        let started = Instant::now();
        let err = fetcher.fetch(&ResourceKey::standings()).await.unwrap_err();
        let elapsed = started.elapsed();

        assert_eq!(provider.calls(), 3);
        assert!(elapsed >= Duration::from_millis(100 + 200));
        assert!(elapsed < Duration::from_millis(100 + 200 + 10));
        match err {
            CacheError::Fetch {
                attempts, source, ..
            } => {
                assert_eq!(attempts, 3);
                assert!(source.to_string().contains("HTTP 503"));
            }
            other => panic!("expected Fetch, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_second_attempt() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(network_error()),
            Ok(fixtures::standings()),
        ]));
        let fetcher = RetryingFetcher::new(provider.clone(), policy());

        let payload = fetcher.fetch(&ResourceKey::standings()).await.unwrap();
        assert_eq!(payload, fixtures::standings());
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_stops_immediately() {
        let provider = Arc::new(ScriptedProvider::failing(ProviderError::NotFound {
            key: "player-stats:1".into(),
        }));
        let fetcher = RetryingFetcher::new(provider.clone(), policy());

        let err = fetcher
            .fetch(&ResourceKey::player_stats(1).unwrap())
            .await
            .unwrap_err();
        assert_eq!(provider.calls(), 1);
        assert!(matches!(err, CacheError::Fetch { attempts: 1, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_extends_delay() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(ProviderError::RateLimited {
                retry_after: Some(Duration::from_secs(2)),
            }),
            Ok(fixtures::standings()),
        ]));
        let fetcher = RetryingFetcher::new(provider.clone(), policy());

        let started = Instant::now();
        fetcher.fetch(&ResourceKey::standings()).await.unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_millis(2010));
    }

    #[test]
    fn test_jitter_stays_in_band() {
        let p = policy().with_jitter(0.5);
        for _ in 0..100 {
            let d = p.delay_for(1, &network_error());
            assert!(d >= Duration::from_millis(50) && d <= Duration::from_millis(150));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_calls_once() {
        let provider = Arc::new(ScriptedProvider::failing(network_error()));
        let fetcher = RetryingFetcher::new(provider.clone(), policy().with_max_attempts(0));

        assert!(fetcher.fetch(&ResourceKey::teams()).await.is_err());
        assert_eq!(provider.calls(), 1);
    }
}
