use crate::embedding::EmbeddingProvider;
use async_trait::async_trait;
use binwise_core::EmbeddingError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Type alias for the injectable sleep function used in tests.
#[cfg(test)]
type SleepFn = Box<
    dyn Fn(Duration) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
        + Send
        + Sync,
>;

/// Retry behaviour for rate-limited embedding calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Base delay in milliseconds for exponential backoff.
    pub backoff_base_ms: u64,
    /// Maximum delay in milliseconds (cap for exponential backoff).
    pub backoff_max_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 500,
            backoff_max_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based): exponential, capped,
    /// and never shorter than a server-provided `retry_after`.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let backoff = self
            .backoff_base_ms
            .saturating_mul(2u64.saturating_pow(attempt))
            .min(self.backoff_max_ms);
        let backoff = Duration::from_millis(backoff);
        let cap = Duration::from_millis(self.backoff_max_ms);
        match retry_after {
            Some(hint) if hint > backoff => hint.min(cap),
            _ => backoff,
        }
    }
}

/// Wraps an embedding provider and retries rate-limited calls with backoff.
///
/// Only [`EmbeddingError::RateLimited`] is retried; service errors and invalid
/// input are returned on the first failure.
pub struct RetryingEmbedding<P> {
    inner: P,
    policy: RetryPolicy,
    /// Injectable sleep function for testing (allows skipping real delays).
    #[cfg(test)]
    sleep_fn: Option<SleepFn>,
}

impl<P: EmbeddingProvider> RetryingEmbedding<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            #[cfg(test)]
            sleep_fn: None,
        }
    }

    async fn do_sleep(&self, delay: Duration) {
        #[cfg(test)]
        if let Some(ref f) = self.sleep_fn {
            f(delay).await;
            return;
        }
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl<P: EmbeddingProvider> EmbeddingProvider for RetryingEmbedding<P> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut attempt = 0;
        loop {
            match self.inner.embed(text).await {
                Ok(vector) => return Ok(vector),
                Err(EmbeddingError::RateLimited { retry_after })
                    if attempt < self.policy.max_retries =>
                {
                    let delay = self.policy.delay_for(attempt, retry_after);
                    info!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Embedding rate limited, backing off"
                    );
                    self.do_sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        warn!(attempts = attempt + 1, "Embedding retries exhausted");
                    }
                    return Err(e);
                }
            }
        }
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}
