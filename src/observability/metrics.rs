//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (request volume, latency, active connections)
//! - Track provider call outcomes
//! - Render Prometheus text exposition for the scrape endpoint
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, route, status code
//! - `http_request_duration_seconds` (histogram): latency by method, route
//! - `http_active_connections` (gauge): requests between start and completion
//! - `provider_requests_total` (counter): provider calls by provider, operation, outcome
//! - `provider_request_duration_seconds` (histogram): provider latency
//!
//! # Design Decisions
//! - Recorder is owned by `AppState`, not installed globally
//! - Every recording operation is total: no return value, never panics
//! - Histogram buckets tuned for typical web latencies

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Content type of the exposition text.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_DURATION: &str = "http_request_duration_seconds";
pub const ACTIVE_CONNECTIONS: &str = "http_active_connections";
pub const PROVIDER_REQUESTS_TOTAL: &str = "provider_requests_total";
pub const PROVIDER_REQUEST_DURATION: &str = "provider_request_duration_seconds";

const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

const PROVIDER_LATENCY_BUCKETS: &[f64] = &[0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("metrics exporter is disabled")]
    Disabled,
    #[error("failed to build Prometheus recorder: {0}")]
    Build(#[from] BuildError),
}

struct Exporter {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

/// Request metrics recorder backed by a Prometheus exporter.
pub struct MetricsRecorder {
    exporter: Option<Exporter>,
    active: AtomicU64,
}

impl MetricsRecorder {
    /// Build a recorder with a Prometheus exporter.
    pub fn new() -> Result<Self, MetricsError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), LATENCY_BUCKETS)?
            .set_buckets_for_metric(
                Matcher::Full(PROVIDER_REQUEST_DURATION.to_string()),
                PROVIDER_LATENCY_BUCKETS,
            )?
            .build_recorder();
        let handle = recorder.handle();

        let this = Self {
            exporter: Some(Exporter { recorder, handle }),
            active: AtomicU64::new(0),
        };
        this.with_recorder(|| {
            describe_counter!(REQUESTS_TOTAL, Unit::Count, "Total HTTP requests");
            describe_histogram!(REQUEST_DURATION, Unit::Seconds, "HTTP request latency");
            describe_gauge!(ACTIVE_CONNECTIONS, "Requests currently in flight");
            describe_counter!(PROVIDER_REQUESTS_TOTAL, Unit::Count, "Total provider calls");
            describe_histogram!(
                PROVIDER_REQUEST_DURATION,
                Unit::Seconds,
                "Provider call latency"
            );
            gauge!(ACTIVE_CONNECTIONS).set(0.0);
        });
        Ok(this)
    }

    /// Build a recorder that drops every observation.
    ///
    /// The active-connection count is still tracked for status reporting.
    pub fn disabled() -> Self {
        Self {
            exporter: None,
            active: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.exporter.is_some()
    }

    fn with_recorder(&self, f: impl FnOnce()) {
        if let Some(exporter) = &self.exporter {
            metrics::with_local_recorder(&exporter.recorder, f);
        }
    }

    /// Record a completed request.
    pub fn record_request(&self, method: &str, route: &str, status: u16, started: Instant) {
        let seconds = started.elapsed().as_secs_f64();
        self.with_recorder(|| {
            counter!(
                REQUESTS_TOTAL,
                "method" => method.to_string(),
                "route" => route.to_string(),
                "status_code" => status.to_string()
            )
            .increment(1);
            histogram!(
                REQUEST_DURATION,
                "method" => method.to_string(),
                "route" => route.to_string()
            )
            .record(seconds);
        });
    }

    /// Record the outcome of a provider call.
    pub fn record_provider_call(
        &self,
        provider: &str,
        operation: &str,
        outcome: &str,
        started: Instant,
    ) {
        let seconds = started.elapsed().as_secs_f64();
        self.with_recorder(|| {
            counter!(
                PROVIDER_REQUESTS_TOTAL,
                "provider" => provider.to_string(),
                "operation" => operation.to_string(),
                "outcome" => outcome.to_string()
            )
            .increment(1);
            histogram!(
                PROVIDER_REQUEST_DURATION,
                "provider" => provider.to_string(),
                "operation" => operation.to_string()
            )
            .record(seconds);
        });
    }

    pub fn increment_active_connections(&self) {
        self.active.fetch_add(1, Ordering::Relaxed);
        self.with_recorder(|| gauge!(ACTIVE_CONNECTIONS).increment(1.0));
    }

    /// Decrement the active-connection gauge, saturating at zero.
    pub fn decrement_active_connections(&self) {
        let decremented = self
            .active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1))
            .is_ok();
        if decremented {
            self.with_recorder(|| gauge!(ACTIVE_CONNECTIONS).decrement(1.0));
        }
    }

    pub fn active_connections(&self) -> u64 {
        self.active.load(Ordering::Relaxed)
    }

    /// Render all metrics in Prometheus text format.
    pub fn render(&self) -> Result<String, MetricsError> {
        self.exporter
            .as_ref()
            .map(|e| e.handle.render())
            .ok_or(MetricsError::Disabled)
    }

    /// Drain histogram buffers. Called periodically by the server.
    pub fn run_upkeep(&self) {
        if let Some(exporter) = &self.exporter {
            exporter.handle.run_upkeep();
        }
    }
}
