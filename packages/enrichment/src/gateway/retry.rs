//! Retry-with-backoff wrapper for retrieval gateways.
//!
//! The policy (attempts, retryable statuses, backoff) is a plain value that
//! can be tested without a transport; `RetryingGateway` applies it to any
//! `RetrievalGateway`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::error::{GatewayResult, RetrievalError};
use crate::traits::gateway::RetrievalGateway;
use crate::types::retrieval::{RetrievalResult, ScrapedPage, SearchOptions};

/// Bounded exponential backoff restricted to transient HTTP statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    ///
    /// Default: 3.
    pub max_attempts: u32,

    /// Delay before the first retry.
    ///
    /// Default: 1s.
    pub base_delay: Duration,

    /// Upper bound for any single delay.
    ///
    /// Default: 8s.
    pub max_delay: Duration,

    /// Statuses worth retrying.
    ///
    /// Default: 429, 502, 503, 504.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            retryable_statuses: vec![429, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::default().with_max_attempts(1)
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_retryable_statuses(mut self, statuses: impl Into<Vec<u16>>) -> Self {
        self.retryable_statuses = statuses.into();
        self
    }

    /// Whether `error` is transient under this policy.
    pub fn is_retryable(&self, error: &RetrievalError) -> bool {
        error
            .status()
            .is_some_and(|status| self.retryable_statuses.contains(&status))
    }

    /// Delay after failed `attempt` (1-based): `base * 2^(attempt-1)`, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> GatewayResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && self.is_retryable(&e) => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient retrieval failure, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// A gateway wrapper that retries transient failures.
pub struct RetryingGateway<G: RetrievalGateway> {
    inner: G,
    policy: RetryPolicy,
}

impl<G: RetrievalGateway> RetryingGateway<G> {
    pub fn new(inner: G, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

#[async_trait]
impl<G: RetrievalGateway> RetrievalGateway for RetryingGateway<G> {
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> GatewayResult<Vec<RetrievalResult>> {
        self.policy
            .run("search", || self.inner.search(query, options))
            .await
    }

    async fn scrape_url(&self, url: &str) -> GatewayResult<ScrapedPage> {
        self.policy
            .run("scrape", || self.inner.scrape_url(url))
            .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Extension methods for any `RetrievalGateway`.
pub trait GatewayExt: RetrievalGateway + Sized {
    /// Wrap this gateway with `policy`.
    fn with_retry(self, policy: RetryPolicy) -> RetryingGateway<Self> {
        RetryingGateway::new(self, policy)
    }
}

impl<G: RetrievalGateway> GatewayExt for G {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGateway;

    fn status(code: u16) -> RetrievalError {
        RetrievalError::Status {
            status: code,
            url: "https://acme.io".to_string(),
        }
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
        assert_eq!(policy.backoff(5), Duration::from_secs(8));
        assert_eq!(policy.backoff(40), Duration::from_secs(8));
    }

    #[test]
    fn test_only_listed_statuses_retry() {
        let policy = RetryPolicy::default();
        assert!(policy.is_retryable(&status(429)));
        assert!(policy.is_retryable(&status(503)));
        assert!(!policy.is_retryable(&status(404)));
        assert!(!policy.is_retryable(&RetrievalError::Timeout {
            url: "https://acme.io".into()
        }));
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let mock = MockGateway::new()
            .with_page("https://acme.io", "<title>Acme</title>")
            .with_scrape_failures("https://acme.io", [503, 503]);
        let gateway = mock
            .clone()
            .with_retry(RetryPolicy::default().with_base_delay(Duration::ZERO));

        let page = gateway.scrape_url("https://acme.io").await.unwrap();
        assert_eq!(page.url, "https://acme.io");
        assert_eq!(mock.scrape_calls(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let mock = MockGateway::new().with_scrape_failures("https://acme.io", [503, 503, 503, 503]);
        let gateway = mock
            .clone()
            .with_retry(RetryPolicy::default().with_base_delay(Duration::ZERO));

        let err = gateway.scrape_url("https://acme.io").await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert_eq!(mock.scrape_calls(), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let mock = MockGateway::new().with_scrape_failures("https://acme.io", [404]);
        let gateway = mock
            .clone()
            .with_retry(RetryPolicy::default().with_base_delay(Duration::ZERO));

        assert!(gateway.scrape_url("https://acme.io").await.is_err());
        assert_eq!(mock.scrape_calls(), 1);
    }
}
