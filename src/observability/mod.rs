//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request interceptor produces:
//!     → ids.rs (correlation + request IDs)
//!     → tracing.rs (trace context open/close, lifecycle log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → logging.rs subscriber (stdout, JSON or pretty)
//!     → Metrics endpoint (Prometheus scrape)
//!     → status.rs (observability status endpoint)
//! ```
//!
//! # Design Decisions
//! - Correlation ID flows through logs, trace contexts and response headers
//! - Metrics are cheap (atomic increments)
//! - Instrumentation never fails the request path

pub mod ids;
pub mod logging;
pub mod metrics;
pub mod status;
pub mod tracing;

pub use self::ids::{generate_correlation_id, generate_request_id};
pub use self::metrics::{MetricsError, MetricsRecorder};
pub use self::status::{observability_status, ObservabilityStatus};
pub use self::tracing::{CompletedTrace, TraceAttributes, TraceContext, TraceGuard, TraceRegistry};
