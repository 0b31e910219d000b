//! Bounded retry policy for image provider calls.
//!
//! Every attempt runs under a caller-visible timeout. Attempts are separated by
//! a fixed delay (or exponential backoff when configured), and a rate-limit
//! response's Retry-After header extends the wait. Exhausting the attempts
//! returns [`ProviderError::RetriesExhausted`] rather than panicking.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use super::{ImageProvider, ProviderError};

/// Default number of attempts per provider call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default per-attempt timeout (3 minutes, covers queue polling backends).
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(180);

/// Maximum delay cap for backoff and Retry-After (60 seconds).
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(60);

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Same delay before every retry.
    #[default]
    Fixed,
    /// `delay * 2^retry`, capped at [`DEFAULT_BACKOFF_MAX`].
    Exponential,
}

/// Bounded retry policy: max attempts, inter-attempt delay, attempt timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: Backoff,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: Duration::from_secs(2),
            backoff: Backoff::Fixed,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Policy with a fixed delay and default attempt count and timeout.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (0-based: the wait after the first
    /// failed attempt is `delay_for(0)`).
    pub fn delay_for(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential => self
                .delay
                .saturating_mul(2u32.saturating_pow(retry))
                .min(DEFAULT_BACKOFF_MAX),
        }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempts are exhausted.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            let outcome = match tokio::time::timeout(self.attempt_timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(self.attempt_timeout)),
            };

            let error = match outcome {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => {
                    log::error!("{}: non-retryable error: {}", label, e);
                    return Err(e);
                }
                Err(e) => e,
            };

            if attempt == max_attempts {
                log::error!(
                    "{}: giving up after {} attempts. Last error: {}",
                    label,
                    attempt,
                    error
                );
                last_error = Some(error);
                break;
            }

            let mut delay = self.delay_for(attempt - 1);
            if let ProviderError::RateLimit {
                retry_after_secs: Some(secs),
                ..
            } = &error
            {
                delay = delay.max(Duration::from_secs(*secs).min(DEFAULT_BACKOFF_MAX));
            }

            log::warn!(
                "{}: attempt {}/{} failed: {}. Retrying in {:?}...",
                label,
                attempt,
                max_attempts,
                error,
                delay
            );
            last_error = Some(error);
            tokio::time::sleep(delay).await;
        }

        Err(ProviderError::RetriesExhausted {
            attempts: max_attempts,
            last: Box::new(last_error.unwrap_or(ProviderError::Timeout(self.attempt_timeout))),
        })
    }
}

/// Decorates any provider so every `generate` call runs under a retry policy.
pub struct RetryingProvider<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P: ImageProvider> RetryingProvider<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: ImageProvider> ImageProvider for RetryingProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, ProviderError> {
        let inner = &self.inner;
        let label = inner.name().to_string();
        self.policy
            .run(&label, move || inner.generate(prompt))
            .await
    }
}
