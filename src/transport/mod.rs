//! Rate-limited, retrying HTTP transport
//!
//! [`Transport`] wraps a raw [`HttpBackend`] with the pieces the IMF service
//! needs before its responses can be trusted:
//!
//! 1. an optional durable [`ResponseCache`] consulted before any network call
//! 2. a shared [`RateLimiter`] enforcing the idle gap between requests
//! 3. response classification, since errors arrive as markup with status 200
//! 4. a retry loop with `unit * 5^attempt` backoff for overloads and bodies
//!    that fail to decode

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{calculate_backoff, ClientConfig};
use crate::endpoints::Endpoints;
use crate::metrics::{record_cache_hit, record_retry_backoff, HttpRequestMetrics};

pub mod cache;
pub mod classify;
pub mod http;
pub mod rate_limit;
pub mod shared_resources;

pub use cache::{CacheError, CachedResponse, ResponseCache};
pub use classify::{classify, strip_markup, ResponseClass};
pub use http::ReqwestBackend;
pub use rate_limit::RateLimiter;

fn display_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "no response".to_string(),
    }
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Every attempt hit a retryable failure
    #[error(
        "API request failed after {attempts} attempts. URL: '{url}' Status: '{}', Content: '{content}'. {}",
        display_status(.status),
        ResponseClass::Overloaded.suggestion()
    )]
    RetriesExhausted {
        url: String,
        status: Option<u16>,
        content: String,
        attempts: u32,
    },

    /// HTTP 400 or a body saying the query is too complex
    #[error(
        "API request failed. URL: '{url}' Status: '{status}', Content: '{content}'. {}",
        ResponseClass::QueryTooLarge.suggestion()
    )]
    QueryTooLarge {
        url: String,
        status: u16,
        content: String,
    },

    /// HTTP 500, usually a malformed query
    #[error(
        "API request failed. URL: '{url}' Status: '{status}', Content: '{content}'. {}",
        ResponseClass::MissingParameter.suggestion()
    )]
    MissingParameter {
        url: String,
        status: u16,
        content: String,
    },

    /// Any other error page or non-success status
    #[error("API request failed. URL: '{url}' Status: '{status}', Content: '{content}'")]
    ApiError {
        url: String,
        status: u16,
        content: String,
    },
}

impl TransportError {
    /// URL of the failed request
    pub fn url(&self) -> &str {
        match self {
            Self::RetriesExhausted { url, .. }
            | Self::QueryTooLarge { url, .. }
            | Self::MissingParameter { url, .. }
            | Self::ApiError { url, .. } => url,
        }
    }

    /// HTTP status of the last response, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RetriesExhausted { status, .. } => *status,
            Self::QueryTooLarge { status, .. }
            | Self::MissingParameter { status, .. }
            | Self::ApiError { status, .. } => Some(*status),
        }
    }
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Failure of the raw HTTP call itself (connect, timeout, body read)
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct BackendError {
    /// Kind of failure
    pub kind: BackendErrorKind,
    /// Underlying error text
    pub message: String,
}

/// Kind of raw HTTP failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// Request timed out
    Timeout,
    /// Connection could not be established
    Connect,
    /// Anything else
    Other,
}

impl std::fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Timeout => "network timeout",
            Self::Connect => "connection",
            Self::Other => "network",
        };
        f.write_str(label)
    }
}

/// Status and body of one HTTP exchange, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status_code: u16,
    /// Response body text
    pub body: String,
}

impl RawResponse {
    /// Construct a raw response
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: body.into(),
        }
    }
}

/// Raw HTTP GET seam
///
/// Implementations issue exactly one request per call with the given
/// `User-Agent` and `Accept: application/json`; retries, throttling and
/// classification belong to [`Transport`].
#[async_trait]
pub trait HttpBackend: Send + Sync {
    /// Perform a GET request
    async fn get(&self, url: &str, user_agent: &str) -> Result<RawResponse, BackendError>;
}

/// A classified, decoded response
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status_code: u16,
    /// Body as received
    pub raw_body: String,
    /// Decoded body
    pub json: Value,
    /// Whether the response was served from the cache
    pub from_cache: bool,
}

/// Last retryable failure, kept for the terminal error
struct RetryableFailure {
    status: Option<u16>,
    content: String,
}

/// Rate-limited, retrying, optionally caching transport
#[derive(Clone)]
pub struct Transport {
    config: ClientConfig,
    endpoints: Endpoints,
    backend: Arc<dyn HttpBackend>,
    rate_limiter: Arc<RateLimiter>,
    cache: Option<ResponseCache>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("config", &self.config)
            .field("rate_limiter", &self.rate_limiter)
            .field("cache", &self.cache)
            .finish()
    }
}

impl Transport {
    /// Create a transport with its own rate limiter
    ///
    /// Use [`Transport::with_rate_limiter`] to share the idle gap with other
    /// transports.
    pub fn new(config: ClientConfig, backend: Arc<dyn HttpBackend>) -> Self {
        let cache = config
            .cache
            .dir
            .as_ref()
            .filter(|_| config.cache.is_enabled())
            .map(|dir| ResponseCache::new(dir.clone(), config.cache.ttl));
        let rate_limiter = Arc::new(RateLimiter::new(config.min_wait));
        let endpoints = Endpoints::new(config.base_url.clone());

        Self {
            config,
            endpoints,
            backend,
            rate_limiter,
            cache,
        }
    }

    /// Transport on the shared HTTP client and shared rate limiter
    pub fn shared(config: ClientConfig) -> Self {
        Self::new(config, Arc::new(ReqwestBackend::shared()))
            .with_rate_limiter(shared_resources::global_rate_limiter())
    }

    /// Replace the rate limiter
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Settings this transport was built with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// URL factory for the configured base URL
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Rate limiter in use
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Idle gap actually enforced between this transport's requests
    pub fn min_wait(&self) -> Duration {
        self.rate_limiter.gap_for(self.config.min_wait)
    }

    /// Fetch and decode `url` with the configured attempt budget
    pub async fn fetch(&self, url: &str) -> TransportResult<TransportResponse> {
        self.fetch_with_attempts(url, self.config.max_attempts).await
    }

    /// Fetch and decode `url` with an explicit attempt budget
    ///
    /// A budget of zero is treated as one attempt.
    pub async fn fetch_with_attempts(
        &self,
        url: &str,
        max_attempts: u32,
    ) -> TransportResult<TransportResponse> {
        let max_attempts = max_attempts.max(1);
        let endpoint = self.endpoints.family_of(url);
        let mut last_failure: Option<RetryableFailure> = None;

        for attempt in 1..=max_attempts {
            if let Some(hit) = self.cached(url, endpoint).await {
                return Ok(hit);
            }

            let metrics = HttpRequestMetrics::start(endpoint, attempt);
            let user_agent = self.config.app_name.user_agent();
            debug!(url = %url, attempt, max_attempts, "Sending request");

            let backend = Arc::clone(&self.backend);
            let result = self
                .rate_limiter
                .run_with_gap(self.config.min_wait, || async move {
                    backend.get(url, user_agent).await
                })
                .await;

            let raw = match result {
                Ok(raw) => {
                    metrics.record_complete(raw.status_code);
                    raw
                }
                Err(e) => {
                    metrics.record_network_error();
                    warn!(
                        url = %url,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Request failed before a response was received"
                    );
                    last_failure = Some(RetryableFailure {
                        status: None,
                        content: e.to_string(),
                    });
                    self.backoff(url, attempt, max_attempts, "network error").await;
                    continue;
                }
            };

            let status = raw.status_code;
            match classify(status, &raw.body) {
                ResponseClass::Success => match serde_json::from_str::<Value>(&raw.body) {
                    Ok(json) => {
                        debug!(url = %url, attempt, status, "Request succeeded");
                        self.save(url, &raw).await;
                        return Ok(TransportResponse {
                            status_code: status,
                            raw_body: raw.body,
                            json,
                            from_cache: false,
                        });
                    }
                    Err(e) => {
                        warn!(
                            url = %url,
                            attempt,
                            max_attempts,
                            status,
                            error = %e,
                            "Response body is not valid JSON"
                        );
                        last_failure = Some(RetryableFailure {
                            status: Some(status),
                            content: strip_markup(&raw.body),
                        });
                        self.backoff(url, attempt, max_attempts, "undecodable body").await;
                    }
                },
                ResponseClass::Overloaded => {
                    warn!(
                        url = %url,
                        attempt,
                        max_attempts,
                        status,
                        "Server overloaded"
                    );
                    last_failure = Some(RetryableFailure {
                        status: Some(status),
                        content: strip_markup(&raw.body),
                    });
                    self.backoff(url, attempt, max_attempts, ResponseClass::Overloaded.description())
                        .await;
                }
                ResponseClass::QueryTooLarge => {
                    return Err(TransportError::QueryTooLarge {
                        url: url.to_string(),
                        status,
                        content: strip_markup(&raw.body),
                    });
                }
                ResponseClass::MissingParameter => {
                    return Err(TransportError::MissingParameter {
                        url: url.to_string(),
                        status,
                        content: strip_markup(&raw.body),
                    });
                }
                ResponseClass::ApiError => {
                    return Err(TransportError::ApiError {
                        url: url.to_string(),
                        status,
                        content: strip_markup(&raw.body),
                    });
                }
            }
        }

        let failure = last_failure.unwrap_or(RetryableFailure {
            status: None,
            content: String::new(),
        });
        Err(TransportError::RetriesExhausted {
            url: url.to_string(),
            status: failure.status,
            content: failure.content,
            attempts: max_attempts,
        })
    }

    /// Sleep out the backoff after a retryable failure, unless it was the last attempt
    async fn backoff(&self, url: &str, attempt: u32, max_attempts: u32, reason: &str) {
        if attempt >= max_attempts {
            return;
        }
        let delay = calculate_backoff(self.config.backoff_unit, attempt);
        record_retry_backoff(delay, attempt);
        info!(
            url = %url,
            "Retrying (attempt {}/{}) after {} - waiting {:.1} seconds...",
            attempt + 1,
            max_attempts,
            reason,
            delay.as_secs_f64()
        );
        sleep(delay).await;
    }

    /// Serve a fresh cache entry, skipping entries that fail to decode
    async fn cached(&self, url: &str, endpoint: &'static str) -> Option<TransportResponse> {
        let cache = self.cache.as_ref().filter(|_| self.config.cache.read)?;
        let entry = match cache.get(url).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!(url = %url, error = %e, "Ignoring unreadable cache entry");
                return None;
            }
        };

        match serde_json::from_str::<Value>(&entry.raw_body) {
            Ok(json) => {
                record_cache_hit(endpoint);
                debug!(url = %url, saved_at = %entry.saved_at, "Serving response from cache");
                Some(TransportResponse {
                    status_code: entry.status_code,
                    raw_body: entry.raw_body,
                    json,
                    from_cache: true,
                })
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Ignoring undecodable cache entry");
                None
            }
        }
    }

    async fn save(&self, url: &str, raw: &RawResponse) {
        let Some(cache) = self.cache.as_ref().filter(|_| self.config.cache.write) else {
            return;
        };
        if let Err(e) = cache.put(url, raw.status_code, &raw.body).await {
            warn!(url = %url, error = %e, "Failed to cache response");
        }
    }
}
