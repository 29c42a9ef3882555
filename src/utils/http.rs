//! Rate-limited HTTP client shared by all metadata sources.
//!
//! Every outbound request of a run goes through one [`HttpClient`]. It keeps
//! a per-host "last request" instant behind a per-host lock and waits until
//! the configured minimum delay for that host has elapsed before sending.
//! A semaphore bounds the number of requests in flight. The host's instant
//! is stamped only once the permit is held, right before the request goes
//! out. Transient failures are retried through [`with_retry_until`], whose
//! backoff also stops on cancellation.
//!
//! Instants come from tokio's clock, so tests can drive the limiter with
//! paused time.

use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, Semaphore, SemaphorePermit};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::retry::{with_retry_until, RetryConfig};

/// Errors surfaced by [`HttpClient::fetch`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The request did not complete within its timeout
    #[error("Request timed out: {url}")]
    Timeout { url: String },

    /// The server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        status: u16,
        url: String,
        /// `Retry-After` seconds, when the server sent one
        retry_after: Option<u64>,
    },

    /// Connection, TLS, body or URL errors
    #[error("Network error: {0}")]
    Network(String),

    /// The run was cancelled before the request was sent
    #[error("Request cancelled")]
    Cancelled,
}

impl FetchError {
    fn from_reqwest(err: reqwest::Error, url: &str) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// A successful HTTP response with its body read
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    /// Deserialize the body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Settings for an [`HttpClient`]
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Value of the `User-Agent` header
    pub user_agent: String,
    /// Timeout used when a request does not specify one
    pub default_timeout: Duration,
    /// Maximum number of requests in flight across all hosts
    pub max_concurrent_requests: usize,
    /// Minimum delay between two requests to the same host
    pub default_host_delay: Duration,
    /// Per-host overrides of the minimum delay
    pub host_delays: HashMap<String, Duration>,
    pub retry: RetryConfig,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            default_timeout: Duration::from_secs(30),
            max_concurrent_requests: 8,
            default_host_delay: Duration::from_secs(1),
            host_delays: HashMap::new(),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Default)]
struct HostState {
    last_request: Option<Instant>,
}

/// Shared, throttled, retrying HTTP accessor
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    hosts: Mutex<HashMap<String, Arc<AsyncMutex<HostState>>>>,
    permits: Semaphore,
    cancel: CancellationToken,
}

impl HttpClient {
    /// Create a client with its own cancellation token
    pub fn new(config: HttpClientConfig) -> Result<Self, FetchError> {
        Self::with_cancellation(config, CancellationToken::new())
    }

    /// Create a client observing the given run-level cancellation token
    pub fn with_cancellation(
        config: HttpClientConfig,
        cancel: CancellationToken,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.default_timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            permits: Semaphore::new(config.max_concurrent_requests.max(1)),
            config,
            hosts: Mutex::new(HashMap::new()),
            cancel,
        })
    }

    /// The cancellation token observed by this client
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Minimum delay enforced between requests to `host`
    pub fn host_delay(&self, host: &str) -> Duration {
        self.config
            .host_delays
            .get(host)
            .copied()
            .unwrap_or(self.config.default_host_delay)
    }

    /// GET `url` with extra headers, retrying transient failures.
    ///
    /// `timeout` overrides the client's default for this request.
    pub async fn fetch(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
        timeout: Option<Duration>,
    ) -> Result<RawResponse, FetchError> {
        let parsed = url::Url::parse(url)
            .map_err(|e| FetchError::Network(format!("Invalid URL {}: {}", url, e)))?;
        let host = parsed.host_str().unwrap_or_default().to_string();
        let timeout = timeout.unwrap_or(self.config.default_timeout);

        with_retry_until(&self.config.retry, &self.cancel, || {
            self.attempt(&host, url, headers, timeout)
        })
        .await
    }

    async fn attempt(
        &self,
        host: &str,
        url: &str,
        headers: &[(&'static str, String)],
        timeout: Duration,
    ) -> Result<RawResponse, FetchError> {
        if self.cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let _permit = self.acquire_slot(host).await?;

        tracing::debug!(url, "GET");

        let mut request = self.client.get(url).timeout(timeout);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, url))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());

            if status == StatusCode::TOO_MANY_REQUESTS {
                tracing::warn!(host, ?retry_after, "Rate limited");
            }

            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
                retry_after,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(e, url))?;

        Ok(RawResponse {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    /// Block until `host` may receive another request and a global permit
    /// is free, then claim the slot.
    ///
    /// The per-host lock is held while waiting for both, so callers
    /// targeting the same host are released one at a time, each
    /// `host_delay` after the previous one actually got its permit.
    async fn acquire_slot(&self, host: &str) -> Result<SemaphorePermit<'_>, FetchError> {
        let host_state = {
            let mut hosts = self
                .hosts
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(hosts.entry(host.to_string()).or_default())
        };

        let mut state = tokio::select! {
            guard = host_state.lock() => guard,
            _ = self.cancel.cancelled() => return Err(FetchError::Cancelled),
        };

        if let Some(last) = state.last_request {
            let ready_at = last + self.host_delay(host);
            if ready_at > Instant::now() {
                tokio::select! {
                    _ = tokio::time::sleep_until(ready_at) => {}
                    _ = self.cancel.cancelled() => return Err(FetchError::Cancelled),
                }
            }
        }

        let permit = tokio::select! {
            permit = self.permits.acquire() => permit
                .map_err(|_| FetchError::Network("HTTP client closed".to_string()))?,
            _ = self.cancel.cancelled() => return Err(FetchError::Cancelled),
        };

        state.last_request = Some(Instant::now());
        Ok(permit)
    }
}
