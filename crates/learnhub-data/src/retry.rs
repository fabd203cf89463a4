//! Retry policies for remote cart calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::RemoteError;

/// Delay between attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    None,
    Fixed(Duration),
    /// `base * 2^attempt`, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl BackoffStrategy {
    /// Delay after the failed attempt `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Fixed(d) => *d,
            Self::Exponential { base, max } => {
                let multiplier = 2u32.saturating_pow(attempt);
                base.saturating_mul(multiplier).min(*max)
            }
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(100),
            max: Duration::from_secs(2),
        }
    }
}

/// Which failures are worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryCondition {
    /// One exact status, e.g. 429.
    StatusCode(u16),
    /// Any 5xx.
    ServerError,
    Timeout,
    ConnectionError,
}

impl RetryCondition {
    pub fn matches(&self, error: &RemoteError) -> bool {
        match (self, error) {
            (Self::StatusCode(code), RemoteError::Http { status, .. }) => status == code,
            (Self::ServerError, RemoteError::Http { status, .. }) => (500..600).contains(status),
            (Self::Timeout, RemoteError::Timeout(_)) => true,
            (Self::ConnectionError, RemoteError::Connection(_)) => true,
            _ => false,
        }
    }
}

/// When and how often a failed remote call is re-sent.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
    pub retry_on: Vec<RetryCondition>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: BackoffStrategy::default(),
            retry_on: vec![
                RetryCondition::ServerError,
                RetryCondition::StatusCode(429),
                RetryCondition::Timeout,
                RetryCondition::ConnectionError,
            ],
        }
    }

    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff = strategy;
        self
    }

    /// Whether a failed attempt (0-indexed) should be retried.
    pub fn should_retry(&self, error: &RemoteError, attempt: u32) -> bool {
        attempt < self.max_attempts && self.retry_on.iter().any(|c| c.matches(error))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// the attempts run out.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) if self.should_retry(&error, attempt) => {
                    let delay = self.backoff.delay_for_attempt(attempt);
                    warn!(attempt, delay_ms = delay.as_millis() as u64, %error, "retrying cart request");
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2)
    }
}
