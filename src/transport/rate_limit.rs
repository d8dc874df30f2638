//! Minimum idle-gap rate limiting
//!
//! The IMF service expects a pause between requests rather than a request
//! budget per window. The limiter therefore tracks when the previous request
//! *finished* and holds the next caller until the configured gap has elapsed.
//! Callers are serialized behind one async mutex, so every transport sharing a
//! limiter observes the gap globally. Each caller names the gap it wants and
//! the limiter enforces the larger of that and its own floor.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::metrics::record_rate_limit_wait;

/// Rate limiter enforcing a minimum idle gap between requests
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_wait: Duration,
    last_completed: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    /// Create a limiter with the given minimum gap
    pub fn new(min_wait: Duration) -> Self {
        Self {
            min_wait,
            last_completed: Arc::new(Mutex::new(None)),
        }
    }

    /// Floor applied to every call, whatever gap the caller asks for
    pub fn min_wait(&self) -> Duration {
        self.min_wait
    }

    /// Gap enforced for a caller asking for `requested`
    pub fn gap_for(&self, requested: Duration) -> Duration {
        self.min_wait.max(requested)
    }

    /// Time still to wait at `now` given the last completion instant
    pub fn remaining_wait(&self, last_completed: Option<Instant>, now: Instant) -> Duration {
        remaining(self.min_wait, last_completed, now)
    }

    /// Run `call` once the limiter's own gap since the previous call has elapsed
    pub async fn run<F, Fut, T>(&self, call: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.run_with_gap(Duration::ZERO, call).await
    }

    /// Run `call` once `max(floor, requested)` has elapsed since the previous call
    ///
    /// The lock is held for the duration of the call so the completion
    /// timestamp of one caller is visible to the next.
    pub async fn run_with_gap<F, Fut, T>(&self, requested: Duration, call: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut last_completed = self.last_completed.lock().await;

        let wait = remaining(self.gap_for(requested), *last_completed, Instant::now());
        if !wait.is_zero() {
            debug!(wait_ms = wait.as_millis() as u64, "Waiting out rate limit gap");
            sleep(wait).await;
        }
        record_rate_limit_wait(wait);

        let result = call().await;
        *last_completed = Some(Instant::now());
        result
    }
}

fn remaining(gap: Duration, last_completed: Option<Instant>, now: Instant) -> Duration {
    match last_completed {
        Some(last) => gap.saturating_sub(now.saturating_duration_since(last)),
        None => Duration::ZERO,
    }
}
