//! Client configuration
//!
//! Settings are process-wide in spirit (application name, minimum wait between
//! requests, cache flags) but are carried in an explicit [`ClientConfig`] that is
//! handed to the transport. Convenience callers can use [`ClientConfig::global`],
//! a read-only instance built once from the environment.

use once_cell::sync::Lazy;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::endpoints::IMF_BASE_URL;

/// Library default `User-Agent` identifier
pub const DEFAULT_APP_NAME: &str = concat!("imf-data-client/", env!("CARGO_PKG_VERSION"));

/// Maximum length of an application name, in characters
pub const MAX_APP_NAME_LEN: usize = 255;

/// Default minimum idle gap between two requests.
/// The IMF service starts rejecting clients that poll faster than this.
pub const DEFAULT_MIN_WAIT: Duration = Duration::from_millis(1500);

/// Default number of attempts per request (first try included)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Multiplier of the exponential backoff schedule (`unit * 5^attempt`)
pub const BACKOFF_FACTOR: u32 = 5;

/// Default backoff unit; with [`BACKOFF_FACTOR`] this gives 5s, 25s, 125s...
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// Default lifetime of a cached response
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Environment variable holding the application name
pub const ENV_APP_NAME: &str = "IMF_APP_NAME";
/// Environment variable holding the minimum wait time in seconds
pub const ENV_WAIT_TIME: &str = "IMF_WAIT_TIME";
/// Environment variable holding the maximum number of attempts
pub const ENV_MAX_ATTEMPTS: &str = "IMF_MAX_ATTEMPTS";
/// Environment variable enabling the response cache in the given directory
pub const ENV_CACHE_DIR: &str = "IMF_CACHE_DIR";

/// Configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Application name longer than [`MAX_APP_NAME_LEN`]
    #[error(
        "Please provide a valid string as the application name (max length: {MAX_APP_NAME_LEN} characters), got {0} characters"
    )]
    AppNameTooLong(usize),

    /// Application name contains control characters
    #[error(
        "The application name contains forbidden characters. Please remove control characters and non-printable ASCII characters."
    )]
    AppNameForbiddenCharacters,

    /// Negative, NaN, out-of-range or unparseable wait time
    #[error("minimum wait time must be a non-negative number of seconds, got '{0}'")]
    InvalidWaitTime(String),

    /// Zero or unparseable attempt count
    #[error("maximum attempts must be a positive integer, got '{0}'")]
    InvalidMaxAttempts(String),
}

/// Compute the backoff delay after failed attempt `attempt` (1-based)
///
/// Follows `unit * 5^attempt`, saturating instead of overflowing.
pub fn calculate_backoff(unit: Duration, attempt: u32) -> Duration {
    unit.saturating_mul(BACKOFF_FACTOR.saturating_pow(attempt))
}

/// Validated application name sent as the `User-Agent` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppName(String);

impl AppName {
    /// Validate an application name
    ///
    /// # Errors
    /// Returns an error if the name exceeds 255 characters or contains
    /// control characters (code points 0-31 and 127).
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();

        let len = name.chars().count();
        if len > MAX_APP_NAME_LEN {
            return Err(ConfigError::AppNameTooLong(len));
        }

        if name.chars().any(|c| (c as u32) < 32 || c as u32 == 127) {
            return Err(ConfigError::AppNameForbiddenCharacters);
        }

        let app_name = Self(name);
        if app_name.is_default() {
            warn!(
                "Best practice is to choose a unique app name. Use of a default or empty app name may result in hitting API rate limits and being blocked by the API."
            );
        }
        Ok(app_name)
    }

    /// Build from a raw environment value, truncating to 255 characters first
    pub fn from_env_value(raw: &str) -> Result<Self, ConfigError> {
        let truncated: String = raw.chars().take(MAX_APP_NAME_LEN).collect();
        Self::new(truncated)
    }

    /// The name as configured (may be empty)
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the name is empty or the library default
    pub fn is_default(&self) -> bool {
        self.0.is_empty() || self.0 == DEFAULT_APP_NAME || self.0 == env!("CARGO_PKG_NAME")
    }

    /// Value for the `User-Agent` header; an empty name falls back to the default
    pub fn user_agent(&self) -> &str {
        if self.0.is_empty() {
            DEFAULT_APP_NAME
        } else {
            &self.0
        }
    }
}

impl Default for AppName {
    fn default() -> Self {
        Self(DEFAULT_APP_NAME.to_string())
    }
}

impl std::fmt::Display for AppName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.user_agent())
    }
}

/// Response cache settings
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Directory holding one file per cached URL; `None` disables caching
    pub dir: Option<PathBuf>,
    /// Serve responses from the cache when a fresh entry exists
    pub read: bool,
    /// Persist successful responses into the cache
    pub write: bool,
    /// Entries older than this are ignored
    pub ttl: Duration,
}

impl CacheConfig {
    /// Disabled cache
    pub fn disabled() -> Self {
        Self {
            dir: None,
            read: false,
            write: false,
            ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Read-write cache in `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            read: true,
            write: true,
            ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Whether any cache traffic is enabled
    pub fn is_enabled(&self) -> bool {
        self.dir.is_some() && (self.read || self.write)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Configuration for a [`crate::transport::Transport`]
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Application name sent as `User-Agent`
    pub app_name: AppName,
    /// Minimum idle gap between the end of one request and the start of the next
    pub min_wait: Duration,
    /// Attempts per request, first try included
    pub max_attempts: u32,
    /// Backoff unit multiplied by `5^attempt`
    pub backoff_unit: Duration,
    /// API base URL
    pub base_url: String,
    /// Response cache settings
    pub cache: CacheConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            app_name: AppName::default(),
            min_wait: DEFAULT_MIN_WAIT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
            base_url: IMF_BASE_URL.to_string(),
            cache: CacheConfig::default(),
        }
    }
}

static GLOBAL_CONFIG: Lazy<ClientConfig> = Lazy::new(|| {
    ClientConfig::from_env().unwrap_or_else(|e| {
        warn!(error = %e, "Invalid IMF client environment configuration, using defaults");
        ClientConfig::default()
    })
});

impl ClientConfig {
    /// Process-wide default configuration, read once from the environment
    pub fn global() -> &'static ClientConfig {
        &GLOBAL_CONFIG
    }

    /// Build a configuration from `IMF_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    ///
    /// Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup(ENV_APP_NAME) {
            config.app_name = AppName::from_env_value(&name)?;
        }

        if let Some(raw) = lookup(ENV_WAIT_TIME) {
            let secs: f64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidWaitTime(raw.clone()))?;
            config = config.with_min_wait_secs(secs)?;
        }

        if let Some(raw) = lookup(ENV_MAX_ATTEMPTS) {
            let attempts: u32 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidMaxAttempts(raw.clone()))?;
            config = config.with_max_attempts(attempts)?;
        }

        if let Some(dir) = lookup(ENV_CACHE_DIR) {
            if !dir.trim().is_empty() {
                config.cache = CacheConfig::in_dir(dir.trim());
            }
        }

        Ok(config)
    }

    /// Set the application name
    pub fn with_app_name(mut self, name: impl Into<String>) -> Result<Self, ConfigError> {
        self.app_name = AppName::new(name)?;
        Ok(self)
    }

    /// Set the minimum idle gap between requests
    pub fn with_min_wait(mut self, min_wait: Duration) -> Self {
        self.min_wait = min_wait;
        self
    }

    /// Set the minimum idle gap from fractional seconds
    pub fn with_min_wait_secs(self, secs: f64) -> Result<Self, ConfigError> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(ConfigError::InvalidWaitTime(secs.to_string()));
        }
        let min_wait = Duration::try_from_secs_f64(secs)
            .map_err(|_| ConfigError::InvalidWaitTime(secs.to_string()))?;
        Ok(self.with_min_wait(min_wait))
    }

    /// Set the number of attempts per request
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(max_attempts.to_string()));
        }
        self.max_attempts = max_attempts;
        Ok(self)
    }

    /// Set the backoff unit
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Point the client at another base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Replace the cache settings
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}
