//! Retry utilities for collaborator calls with exponential backoff.
//!
//! Only transient transport failures are retried. Authentication failures
//! and undecodable payloads are returned immediately so the caller can show
//! an error state without delay.

use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::errors::SpamOriginError;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt)
    pub max_attempts: u32,

    /// Initial delay between retries
    pub initial_delay: Duration,

    /// Maximum delay between retries (for exponential backoff)
    pub max_delay: Duration,

    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,

    /// Whether to add jitter to prevent thundering herd
    pub jitter: bool,

    /// Maximum total time to spend retrying
    pub max_total_duration: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: true,
            max_total_duration: Some(Duration::from_secs(60)),
        }
    }
}

/// Policy for determining if an operation should be retried
pub trait RetryPolicy<E> {
    /// Returns true if the operation should be retried for this error
    fn should_retry(&self, error: &E, attempt: u32) -> bool;
}

/// Retries transport-category errors only.
pub struct TransportRetryPolicy;

impl RetryPolicy<SpamOriginError> for TransportRetryPolicy {
    fn should_retry(&self, error: &SpamOriginError, _attempt: u32) -> bool {
        error.is_retryable()
    }
}

/// Retry executor that handles the retry logic
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Execute an async operation with retry logic.
    ///
    /// The operation always runs at least once, even when the total duration
    /// budget is zero.
    pub async fn execute<F, Fut, T, E, P>(&self, operation: F, policy: P) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        P: RetryPolicy<E>,
        E: std::fmt::Display,
    {
        let start_time = Instant::now();
        let mut delay = self.config.initial_delay;
        let mut attempt = 0;

        loop {
            let error = match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => error,
            };

            let out_of_time = self
                .config
                .max_total_duration
                .is_some_and(|max| start_time.elapsed() >= max);
            if attempt >= self.config.max_attempts
                || out_of_time
                || !policy.should_retry(&error, attempt)
            {
                return Err(error);
            }

            let actual_delay = if self.config.jitter {
                add_jitter(delay)
            } else {
                delay
            };
            debug!(
                attempt = attempt + 1,
                delay_ms = actual_delay.as_millis() as u64,
                "retrying after error: {error}"
            );
            sleep(actual_delay).await;

            delay = std::cmp::min(
                Duration::from_millis(
                    (delay.as_millis() as f64 * self.config.backoff_multiplier) as u64,
                ),
                self.config.max_delay,
            );
            attempt += 1;
        }
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

/// Add random jitter to prevent thundering herd problems
fn add_jitter(delay: Duration) -> Duration {
    use rand::Rng;

    let jitter_range = delay.as_millis() as f64 * 0.1; // 10% jitter
    if jitter_range <= 0.0 {
        return delay;
    }
    let mut rng = rand::rng();
    let jitter: f64 = rng.random_range(-jitter_range..=jitter_range);

    let jittered_ms = (delay.as_millis() as f64 + jitter).max(0.0) as u64;
    Duration::from_millis(jittered_ms)
}

/// Builder pattern for creating retry configurations
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RetryConfig::default(),
        }
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.config.initial_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay = delay;
        self
    }

    pub fn jitter(mut self, enabled: bool) -> Self {
        self.config.jitter = enabled;
        self
    }

    pub fn build(self) -> RetryConfig {
        self.config
    }
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(attempts: u32) -> RetryExecutor {
        RetryExecutor::new(
            RetryConfigBuilder::new()
                .max_attempts(attempts)
                .initial_delay(Duration::from_millis(1))
                .max_delay(Duration::from_millis(2))
                .jitter(false)
                .build(),
        )
    }

    #[tokio::test]
    async fn retries_transport_errors_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = fast(3)
            .execute(
                move || async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(SpamOriginError::transport("fetch", "connection reset"))
                    } else {
                        Ok(n)
                    }
                },
                TransportRetryPolicy,
            )
            .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn auth_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = fast(3)
            .execute(
                move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(SpamOriginError::auth("graph", "401"))
                },
                TransportRetryPolicy,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = fast(2)
            .execute(
                move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(SpamOriginError::transport("fetch", "timeout"))
                },
                TransportRetryPolicy,
            )
            .await;
        assert!(matches!(result, Err(SpamOriginError::Transport { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn jitter_stays_within_ten_percent() {
        let base = Duration::from_millis(1000);
        for _ in 0..50 {
            let d = add_jitter(base).as_millis();
            assert!((900..=1100).contains(&d), "jittered delay {d} out of range");
        }
        assert_eq!(add_jitter(Duration::ZERO), Duration::ZERO);
    }
}
