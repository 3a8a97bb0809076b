//! Shared gate in front of every remote call
//!
//! The gate bounds the number of outstanding calls with a semaphore, puts a
//! timeout on each attempt and retries transient failures with exponential
//! backoff. Fatal and permanent errors are returned immediately.
//!
//! # Backoff schedule (example with `backoff_base = 500ms`)
//!
//! | Attempt | Sleep before next attempt |
//! |---------|--------------------------|
//! | 0 (initial) | none |
//! | 1 (first retry) | 500ms |
//! | 2 (second retry) | 1s |
//! | 3 (third retry) | 2s |

use crate::config::RuntimeConfig;
use crate::{ApiError, ApiResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Retry and timeout settings for remote calls
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each further retry
    pub backoff_base: Duration,

    /// Upper bound on a single attempt
    pub call_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            call_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(1u32 << attempt.min(16))
    }
}

/// Concurrency limiter plus retry policy, cheap to clone
#[derive(Debug, Clone)]
pub struct RequestGate {
    permits: Arc<Semaphore>,
    policy: RetryPolicy,
}

impl RequestGate {
    pub fn new(max_concurrent: usize, policy: RetryPolicy) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            policy,
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(
            config.max_concurrent_requests as usize,
            RetryPolicy::from_config(config),
        )
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `operation` under the gate
    ///
    /// A permit is held only for the duration of one attempt, never across a
    /// backoff sleep.
    pub async fn call<T, F, Fut>(&self, label: &str, mut operation: F) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let mut attempt = 0u32;

        loop {
            let result = {
                let _permit = self.permits.acquire().await.ok();
                match tokio::time::timeout(self.policy.call_timeout, operation()).await {
                    Ok(result) => result,
                    Err(_) => Err(ApiError::Timeout(self.policy.call_timeout)),
                }
            };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retriable() || attempt >= self.policy.max_retries {
                return Err(err);
            }

            let delay = self.policy.backoff_delay(attempt);
            tracing::warn!(
                call = label,
                attempt = attempt + 1,
                max_retries = self.policy.max_retries,
                ?delay,
                error = %err,
                "transient API error, retrying after backoff"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
