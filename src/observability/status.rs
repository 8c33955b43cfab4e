//! Observability status snapshot.

use serde::Serialize;

use crate::config::ObservabilityConfig;
use crate::observability::metrics::MetricsRecorder;

/// Which observability subsystems are active, plus the live connection gauge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObservabilityStatus {
    pub metrics: bool,
    pub tracing: bool,
    pub prometheus_endpoint: String,
    pub correlation_ids: bool,
    pub structured_logging: bool,
    pub active_connections: u64,
}

/// Read the current observability status.
pub fn observability_status(
    config: &ObservabilityConfig,
    metrics: &MetricsRecorder,
) -> ObservabilityStatus {
    ObservabilityStatus {
        metrics: metrics.is_enabled(),
        tracing: config.tracing_enabled,
        prometheus_endpoint: config.metrics_path.clone(),
        correlation_ids: true,
        structured_logging: config.log_format.is_structured(),
        active_connections: metrics.active_connections(),
    }
}
