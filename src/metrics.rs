//! Observability metrics for the IMF client
//!
//! Counters and histograms for HTTP attempts, retries, cache hits, rate-limit
//! waits and whole dataset queries, emitted through the `metrics` facade.
//! Nothing is recorded anywhere until a recorder is installed, either by the
//! caller or through [`init_metrics`] with the Prometheus exporter.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const UNINITIALIZED: u8 = 0;
const INSTALLING: u8 = 1;
const READY: u8 = 2;

static METRICS_STATE: AtomicU8 = AtomicU8::new(UNINITIALIZED);

static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Initialize the Prometheus exporter and metric descriptions
///
/// Idempotent: only the first caller installs the exporter, concurrent and
/// later calls are no-ops. A failed install releases the slot for a retry.
pub fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_STATE
        .compare_exchange(UNINITIALIZED, INSTALLING, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        METRICS_STATE.store(UNINITIALIZED, Ordering::SeqCst);
        return Err(format!("Failed to install Prometheus exporter: {e}").into());
    }

    describe_counter!(
        "imf_http_requests_total",
        Unit::Count,
        "Total number of HTTP requests made to the IMF service"
    );
    describe_histogram!(
        "imf_http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "imf_http_retries_total",
        Unit::Count,
        "Total number of retry attempts"
    );
    describe_histogram!(
        "imf_retry_backoff_duration_seconds",
        Unit::Seconds,
        "Duration of retry backoff in seconds"
    );
    describe_counter!(
        "imf_cache_hits_total",
        Unit::Count,
        "Responses served from the response cache"
    );
    describe_histogram!(
        "imf_rate_limit_wait_seconds",
        Unit::Seconds,
        "Time spent waiting out the idle gap between requests"
    );
    describe_counter!(
        "imf_queries_completed_total",
        Unit::Count,
        "Dataset queries that produced a result"
    );
    describe_counter!(
        "imf_queries_failed_total",
        Unit::Count,
        "Dataset queries that failed"
    );

    METRICS_STATE.store(READY, Ordering::SeqCst);
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Whether [`init_metrics`] has completed
pub fn is_initialized() -> bool {
    METRICS_STATE.load(Ordering::SeqCst) == READY
}

/// Generate a correlation ID for request tracing
pub fn generate_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{id:08x}")
}

/// Timing and outcome of one HTTP attempt
pub struct HttpRequestMetrics {
    endpoint: &'static str,
    start_time: Instant,
    correlation_id: String,
    attempt: u32,
}

impl HttpRequestMetrics {
    /// Start recording an attempt against an endpoint family
    pub fn start(endpoint: &'static str, attempt: u32) -> Self {
        let correlation_id = generate_correlation_id();
        debug!(
            correlation_id = %correlation_id,
            endpoint = endpoint,
            attempt = attempt,
            "Starting HTTP request metrics"
        );

        Self {
            endpoint,
            start_time: Instant::now(),
            correlation_id,
            attempt,
        }
    }

    /// Record a response with the given status
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();

        counter!(
            "imf_http_requests_total",
            "endpoint" => self.endpoint,
            "status" => status_code.to_string(),
            "attempt" => self.attempt.to_string(),
        )
        .increment(1);
        histogram!("imf_http_request_duration_seconds", "endpoint" => self.endpoint)
            .record(duration.as_secs_f64());

        debug!(
            correlation_id = %self.correlation_id,
            endpoint = self.endpoint,
            status = status_code,
            duration_ms = duration.as_millis() as u64,
            "HTTP request completed"
        );
    }

    /// Record an attempt that produced no response
    pub fn record_network_error(&self) {
        let duration = self.start_time.elapsed();

        counter!(
            "imf_http_requests_total",
            "endpoint" => self.endpoint,
            "status" => "network_error",
            "attempt" => self.attempt.to_string(),
        )
        .increment(1);
        histogram!("imf_http_request_duration_seconds", "endpoint" => self.endpoint)
            .record(duration.as_secs_f64());

        warn!(
            correlation_id = %self.correlation_id,
            endpoint = self.endpoint,
            attempt = self.attempt,
            duration_ms = duration.as_millis() as u64,
            "Network error recorded"
        );
    }

    /// Correlation ID of this attempt
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Record a retry backoff
pub fn record_retry_backoff(duration: Duration, attempt: u32) {
    counter!("imf_http_retries_total", "attempt" => attempt.to_string()).increment(1);
    histogram!("imf_retry_backoff_duration_seconds", "attempt" => attempt.to_string())
        .record(duration.as_secs_f64());
}

/// Record a response served from the cache
pub fn record_cache_hit(endpoint: &'static str) {
    counter!("imf_cache_hits_total", "endpoint" => endpoint).increment(1);
}

/// Record time spent waiting on the rate limiter
pub fn record_rate_limit_wait(wait: Duration) {
    histogram!("imf_rate_limit_wait_seconds").record(wait.as_secs_f64());
}

/// Outcome tracking for one dataset query
pub struct QueryMetrics {
    dataset_id: String,
    start_time: Instant,
}

impl QueryMetrics {
    /// Start tracking a dataset query
    pub fn start(dataset_id: impl Into<String>) -> Self {
        let dataset_id = dataset_id.into();
        debug!(dataset_id = %dataset_id, "Dataset query started");
        Self {
            dataset_id,
            start_time: Instant::now(),
        }
    }

    /// Record a successful query
    pub fn record_success(&self, records: usize) {
        counter!("imf_queries_completed_total", "dataset" => self.dataset_id.clone())
            .increment(1);
        info!(
            dataset_id = %self.dataset_id,
            records = records,
            duration_ms = self.start_time.elapsed().as_millis() as u64,
            "Dataset query completed"
        );
    }

    /// Record a failed query
    pub fn record_failure(&self, error: &str) {
        counter!("imf_queries_failed_total", "dataset" => self.dataset_id.clone())
            .increment(1);
        warn!(
            dataset_id = %self.dataset_id,
            error = %error,
            duration_ms = self.start_time.elapsed().as_millis() as u64,
            "Dataset query failed"
        );
    }
}
