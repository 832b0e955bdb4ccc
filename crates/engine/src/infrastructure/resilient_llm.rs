//! Retrying decorator for the narration oracle.
//!
//! Transient failures (network errors, 5xx, 408, 429, unreadable bodies) are
//! retried with exponential backoff and jitter. Client errors are returned at
//! once. The turn core never retries; this wrapper is the only retry policy.

use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use crate::infrastructure::ports::{LlmError, LlmPort, LlmRequest, LlmResponse};

/// Retry settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Extra attempts after the first one (0 disables retrying)
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds
    pub base_delay_ms: u64,
    /// Upper bound for any single delay, in milliseconds
    pub max_delay_ms: u64,
    /// Fraction (0.0-1.0) of the delay randomly added or removed
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            jitter_factor: 0.2,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `retry` (1-based), without jitter.
    fn backoff_ms(&self, retry: u32) -> u64 {
        let factor = 2u64.saturating_pow(retry.saturating_sub(1));
        self.base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms)
    }

    /// Delay before retry number `retry`, with jitter applied.
    fn delay(&self, retry: u32) -> Duration {
        let backoff = self.backoff_ms(retry);
        let spread = (backoff as f64 * self.jitter_factor.clamp(0.0, 1.0)) as u64;
        let millis = if spread == 0 {
            backoff
        } else {
            let low = backoff.saturating_sub(spread);
            rand::thread_rng().gen_range(low..=backoff.saturating_add(spread))
        };
        Duration::from_millis(millis)
    }
}

/// HTTP status at the start of a `RequestFailed` message (`"503: ..."`).
fn leading_status(message: &str) -> Option<u16> {
    let code = message.split(':').next()?.trim();
    if code.len() == 3 {
        code.parse().ok()
    } else {
        None
    }
}

fn is_transient(error: &LlmError) -> bool {
    match error {
        LlmError::RequestFailed(message) => match leading_status(message) {
            Some(408 | 429) => true,
            Some(status) => !(400..500).contains(&status),
            // No status: connection refused, timeout, reset
            None => true,
        },
        LlmError::InvalidResponse(_) => true,
    }
}

/// Wraps an [`LlmPort`] and retries transient failures.
pub struct ResilientLlmClient {
    inner: Arc<dyn LlmPort>,
    config: RetryConfig,
}

impl ResilientLlmClient {
    pub fn new(inner: Arc<dyn LlmPort>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl LlmPort for ResilientLlmClient {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let mut retry = 0;
        loop {
            let error = match self.inner.generate(request.clone()).await {
                Ok(response) => {
                    if retry > 0 {
                        tracing::info!(retries = retry, "Narrator call recovered");
                    }
                    return Ok(response);
                }
                Err(error) => error,
            };

            if !is_transient(&error) {
                tracing::error!(error = %error, "Narrator call failed, not retrying");
                return Err(error);
            }
            if retry >= self.config.max_retries {
                tracing::error!(
                    attempts = retry + 1,
                    error = %error,
                    "Narrator call failed, retries exhausted"
                );
                return Err(error);
            }

            retry += 1;
            let delay = self.config.delay(retry);
            tracing::warn!(
                retry,
                max_retries = self.config.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Narrator call failed, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
