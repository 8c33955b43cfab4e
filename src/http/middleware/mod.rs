//! Request interceptors.
//!
//! - `trace_requests`: full instrumentation (trace context, metrics, headers)
//! - `tag_health_check`: header tagging only, for high-frequency health probes

pub mod correlation;

pub use correlation::{tag_health_check, trace_requests, HttpStatusError, RequestLifecycle, RequestState};
