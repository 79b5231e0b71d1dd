//! Common error type and retry loop for the external stores
//!
//! Both the user store (Postgres) and the session store (Redis) are called on
//! the request path. A transient failure is retried a bounded number of times
//! with exponential backoff; anything else, or a failure that outlives the
//! retry budget, is reported as unavailable so the request fails fast.

use std::future::Future;
use std::time::Duration;

use taskboard_shared::AuthError;
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

use crate::config::RetryConfig;

/// Errors reported by store implementations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Worth retrying: connection refused, dropped, timed out
    #[error("transient store failure: {0}")]
    Transient(String),

    /// The store is not usable for this request
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A unique constraint rejected the write
    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Transient(msg) | StoreError::Unavailable(msg) => {
                AuthError::ServiceUnavailable(msg)
            }
            StoreError::Duplicate(_) => AuthError::EmailInUse,
            StoreError::Other(e) => AuthError::Internal(e.to_string()),
        }
    }
}

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before the attempt following `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

/// Run `op` until it succeeds, fails permanently, or the attempts run out.
///
/// Transient errors that exhaust the budget come back as
/// [`StoreError::Unavailable`]; other errors are returned unchanged.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut op: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() => {
                if attempt >= policy.max_attempts {
                    warn!(operation, attempt, error = %err, "Store retries exhausted");
                    return Err(StoreError::Unavailable(err.to_string()));
                }
                let delay = policy.delay_after(attempt);
                metrics::counter!("store_retries_total", "operation" => operation).increment(1);
                warn!(
                    operation,
                    attempt,
                    retry_delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Store call failed, retrying"
                );
                sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
