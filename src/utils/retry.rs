//! Retry utilities with exponential backoff for resilient API calls.

use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use super::http::FetchError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Builder-style override of the attempt count
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Backoff delay after the given failed attempt (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self.initial_delay.as_secs_f64()
            * self
                .backoff_multiplier
                .powi(attempt.saturating_sub(1) as i32);
        Duration::from_secs_f64(exp.min(self.max_delay.as_secs_f64()))
    }
}

/// Transient failures that should trigger a retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientError {
    /// Network connectivity issues
    Network,
    /// Request timeout
    Timeout,
    /// Too many requests (429), with the server's `Retry-After` seconds if sent
    RateLimit(Option<u64>),
    /// Server error (5xx)
    ServerError(u16),
}

impl TransientError {
    /// Classify a fetch error; `None` means the error is permanent
    pub fn from_fetch_error(err: &FetchError) -> Option<Self> {
        match err {
            FetchError::Timeout { .. } => Some(TransientError::Timeout),
            FetchError::Network(_) => Some(TransientError::Network),
            FetchError::HttpStatus {
                status: 429,
                retry_after,
                ..
            } => Some(TransientError::RateLimit(*retry_after)),
            FetchError::HttpStatus { status, .. } if (500..600).contains(status) => {
                Some(TransientError::ServerError(*status))
            }
            FetchError::HttpStatus { .. } | FetchError::Cancelled => None,
        }
    }

    /// Minimum delay demanded by the server, if any
    pub fn required_delay(&self) -> Option<Duration> {
        match self {
            TransientError::RateLimit(Some(seconds)) => Some(Duration::from_secs(*seconds)),
            _ => None,
        }
    }
}

/// Execute an async operation, retrying transient failures with exponential
/// backoff. The last error is returned once `max_attempts` is reached;
/// permanent errors are returned immediately.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, FetchError>>,
{
    with_retry_until(config, &CancellationToken::new(), operation).await
}

/// Like [`with_retry`], but a backoff wait ends early with
/// [`FetchError::Cancelled`] once `cancel` fires
pub async fn with_retry_until<T, F, Fut>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, FetchError>>,
{
    let mut attempts = 0;

    loop {
        attempts += 1;

        let error = match operation().await {
            Ok(result) => {
                if attempts > 1 {
                    tracing::debug!(
                        "Operation succeeded on attempt {} after {} transient failures",
                        attempts,
                        attempts - 1
                    );
                }
                return Ok(result);
            }
            Err(error) => error,
        };

        let Some(transient) = TransientError::from_fetch_error(&error) else {
            return Err(error);
        };

        if attempts >= config.max_attempts {
            tracing::warn!("Giving up after {} attempts: {}", attempts, error);
            return Err(error);
        }

        let delay = config.backoff(attempts);
        let delay = transient
            .required_delay()
            .map_or(delay, |required| delay.max(required));

        tracing::debug!(
            "Transient error on attempt {}: {:?}, retrying in {:?}",
            attempts,
            transient,
            delay
        );

        tokio::select! {
            _ = sleep(delay) => {}
            _ = cancel.cancelled() => {
                tracing::debug!("Retry backoff interrupted by cancellation");
                return Err(FetchError::Cancelled);
            }
        }
    }
}
