//! Shared resources for all transports
//!
//! The IMF service throttles per client, not per connection. Default transports
//! therefore share one HTTP client (for connection pooling) and one rate limiter
//! (so independent query pipelines still respect the idle gap together).

use once_cell::sync::Lazy;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use super::rate_limit::RateLimiter;

/// HTTP connect timeout (seconds)
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
/// HTTP request timeout (seconds); large compact-data responses can be slow
const HTTP_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Global HTTP client shared by all transports
pub static GLOBAL_HTTP_CLIENT: Lazy<Arc<Client>> = Lazy::new(|| {
    Arc::new(
        Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                panic!("FATAL: Failed to build HTTP client: {}. Check system TLS configuration.", e);
            }),
    )
});

/// Global rate limiter for the IMF service
///
/// It has no floor of its own; each transport enforces its configured
/// `min_wait` through it.
pub static GLOBAL_IMF_RATE_LIMITER: Lazy<Arc<RateLimiter>> =
    Lazy::new(|| Arc::new(RateLimiter::new(Duration::ZERO)));

/// Get the global HTTP client
pub fn global_http_client() -> Arc<Client> {
    GLOBAL_HTTP_CLIENT.clone()
}

/// Get the global IMF rate limiter
pub fn global_rate_limiter() -> Arc<RateLimiter> {
    GLOBAL_IMF_RATE_LIMITER.clone()
}
