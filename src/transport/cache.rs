//! Durable response cache
//!
//! One JSON file per URL, named by the SHA-256 of the URL, holding the status
//! code and raw body of a successful response. Writes go through a temp file and
//! an atomic rename under a single directory-wide `fd-lock` file
//! ([`LOCK_FILE_NAME`]) so concurrent pipelines never observe a half-written
//! entry. Entries older than the configured TTL are treated as absent.
//!
//! [`ResponseCache::load`] and [`ResponseCache::store`] block on the lock and
//! the filesystem; async callers use [`ResponseCache::get`] and
//! [`ResponseCache::put`], which run them on the blocking pool.

use chrono::{DateTime, Utc};
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Lock file shared by every entry in a cache directory
pub const LOCK_FILE_NAME: &str = ".imf-cache.lock";

/// Cache errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Filesystem error
    #[error("cache IO error: {0}")]
    IoError(String),

    /// Lock file error
    #[error("cache lock error: {0}")]
    LockError(String),

    /// Entry could not be (de)serialized
    #[error("cache serialization error: {0}")]
    SerializationError(String),

    /// Blocking cache task panicked or was cancelled
    #[error("cache task error: {0}")]
    TaskError(String),
}

/// A cached response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// HTTP status of the original response
    pub status_code: u16,
    /// Body of the original response
    pub raw_body: String,
    /// When the entry was written
    pub saved_at: DateTime<Utc>,
}

impl CachedResponse {
    /// Entry stamped with the current time
    pub fn new(status_code: u16, raw_body: impl Into<String>) -> Self {
        Self {
            status_code,
            raw_body: raw_body.into(),
            saved_at: Utc::now(),
        }
    }

    /// Whether the entry is older than `ttl`
    pub fn is_expired(&self, ttl: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.saved_at);
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => age > ttl,
            // TTL beyond chrono's range never expires
            Err(_) => false,
        }
    }
}

/// Directory-backed response cache
#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ResponseCache {
    /// Create a cache rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    /// Cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic key for a URL (lowercase hex SHA-256)
    pub fn key_for(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Entry file for a URL
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.json", Self::key_for(url)))
    }

    /// Lock file guarding every entry in the directory
    pub fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE_NAME)
    }

    fn open_lock(&self) -> Result<RwLock<std::fs::File>, CacheError> {
        let lock_path = self.lock_path();
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| CacheError::LockError(format!("Failed to create lock file: {e}")))?;
        Ok(RwLock::new(lock_file))
    }

    /// Load a fresh entry for `url`
    ///
    /// Returns `Ok(None)` when no entry exists or the entry has expired.
    pub fn load(&self, url: &str) -> Result<Option<CachedResponse>, CacheError> {
        let path = self.path_for(url);
        if !path.exists() {
            return Ok(None);
        }

        let lock = self.open_lock()?;
        let _guard = lock
            .read()
            .map_err(|e| CacheError::LockError(format!("Failed to acquire read lock: {e}")))?;

        let contents =
            std::fs::read_to_string(&path).map_err(|e| CacheError::IoError(e.to_string()))?;
        let entry: CachedResponse = serde_json::from_str(&contents).map_err(|e| {
            warn!(path = %path.display(), error = %e, "Failed to deserialize cache entry");
            CacheError::SerializationError(e.to_string())
        })?;

        if entry.is_expired(self.ttl) {
            debug!(url = %url, saved_at = %entry.saved_at, "Cache entry expired");
            return Ok(None);
        }

        debug!(url = %url, path = %path.display(), "Cache hit");
        Ok(Some(entry))
    }

    /// Persist a response for `url`
    pub fn store(&self, url: &str, status_code: u16, raw_body: &str) -> Result<(), CacheError> {
        self.store_entry(url, &CachedResponse::new(status_code, raw_body))
    }

    /// Persist a prepared entry for `url` atomically
    pub fn store_entry(&self, url: &str, entry: &CachedResponse) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| CacheError::IoError(e.to_string()))?;

        let path = self.path_for(url);
        let json = serde_json::to_string(entry)
            .map_err(|e| CacheError::SerializationError(e.to_string()))?;

        let mut lock = self.open_lock()?;
        let _guard = lock
            .write()
            .map_err(|e| CacheError::LockError(format!("Failed to acquire write lock: {e}")))?;

        let mut temp_file = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| CacheError::IoError(format!("Failed to create temp file: {e}")))?;
        temp_file
            .write_all(json.as_bytes())
            .map_err(|e| CacheError::IoError(format!("Failed to write to temp file: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| CacheError::IoError(format!("Failed to flush temp file: {e}")))?;
        temp_file
            .persist(&path)
            .map_err(|e| CacheError::IoError(format!("Failed to persist temp file: {e}")))?;

        debug!(url = %url, path = %path.display(), bytes = json.len(), "Response cached");
        Ok(())
    }

    /// [`ResponseCache::load`] on the blocking pool
    pub async fn get(&self, url: &str) -> Result<Option<CachedResponse>, CacheError> {
        let cache = self.clone();
        let url = url.to_string();
        tokio::task::spawn_blocking(move || cache.load(&url))
            .await
            .map_err(|e| CacheError::TaskError(format!("Task join error: {e}")))?
    }

    /// [`ResponseCache::store`] on the blocking pool
    pub async fn put(&self, url: &str, status_code: u16, raw_body: &str) -> Result<(), CacheError> {
        let cache = self.clone();
        let url = url.to_string();
        let raw_body = raw_body.to_string();
        tokio::task::spawn_blocking(move || cache.store(&url, status_code, &raw_body))
            .await
            .map_err(|e| CacheError::TaskError(format!("Task join error: {e}")))?
    }
}
