//! Bounded retry with linearly increasing delay.

use crate::error::{GenAiError, GenAiResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// How often and how patiently to retry a collaborator call.
///
/// Attempt `n` (1-based) that fails waits `n × base_delay` before the next
/// one, so the defaults wait 1 s then 2 s and give up after the third.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
        }
    }

    /// Delay after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(attempt as u64))
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Run `call` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut call: F) -> GenAiResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = GenAiResult<T>>,
{
    let attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        let err = match call().await {
            Ok(value) => {
                if attempt > 1 {
                    log::debug!("{what}: succeeded on attempt {attempt}");
                }
                return Ok(value);
            }
            Err(e) => e,
        };
        if !err.is_retryable() {
            return Err(err);
        }
        if attempt >= attempts {
            log::warn!("{what}: giving up after {attempts} attempts: {err}");
            return Err(GenAiError::Exhausted {
                attempts,
                last: Box::new(err),
            });
        }
        let delay = policy.delay_after(attempt);
        log::warn!("{what}: attempt {attempt}/{attempts} failed ({err}), retrying in {delay:?}");
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
