//! Timeout and bounded retry around calls to external providers.

use std::{future::Future, time::Duration};

use tracing::warn;

use crate::{config::UpstreamConfig, error::ApiError};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub timeout: Duration,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            timeout: Duration::from_secs(10),
            backoff_base: Duration::from_millis(200),
            backoff_max: Duration::from_secs(5),
        }
    }
}

impl From<&UpstreamConfig> for RetryPolicy {
    fn from(cfg: &UpstreamConfig) -> Self {
        Self {
            attempts: cfg.max_attempts.max(1),
            timeout: cfg.timeout(),
            ..Self::default()
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `n + 1` (n starts at 1).
    pub fn backoff(&self, n: u32) -> Duration {
        let factor = 1u32 << (n.saturating_sub(1)).min(16);
        self.backoff_base.saturating_mul(factor).min(self.backoff_max)
    }
}

/// Runs `op` until it succeeds or the attempts run out. A timed-out attempt
/// counts as a failure and is retried like any other.
pub async fn call<T, F, Fut>(
    policy: &RetryPolicy,
    provider: &'static str,
    mut op: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut last = String::new();
    for attempt in 1..=policy.attempts {
        match tokio::time::timeout(policy.timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => last = format!("{e:#}"),
            Err(_) => last = format!("timed out after {:?}", policy.timeout),
        }
        warn!(provider, attempt, error = %last, "upstream call failed");
        if attempt < policy.attempts {
            tokio::time::sleep(policy.backoff(attempt)).await;
        }
    }
    Err(ApiError::Upstream {
        provider,
        message: last,
    })
}
