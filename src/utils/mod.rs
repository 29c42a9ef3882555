//! Utility modules supporting metadata retrieval.
//!
//! - [`HttpClient`]: shared HTTP client with per-host pacing, bounded
//!   concurrency and run-level cancellation
//! - [`RetryConfig`]: Configuration for retry logic with exponential backoff
//! - [`with_retry`]: Execute an operation with automatic retry on transient errors
//! - [`with_retry_until`]: The same, with backoff waits that end on cancellation
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use biomed_screen::utils::{with_retry, FetchError, RetryConfig};
//!
//! # async fn fetch_data() -> Result<String, FetchError> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), FetchError> {
//! let config = RetryConfig::default().max_attempts(3);
//! let body = with_retry(&config, || fetch_data()).await?;
//! # Ok(())
//! # }
//! ```

mod http;
mod retry;

pub use http::{FetchError, HttpClient, HttpClientConfig, RawResponse};
pub use retry::{with_retry, with_retry_until, RetryConfig, TransientError};
