//! Emotion-analysis gateway library.
//!
//! Correlation IDs, trace-context tracking and request metrics for an HTTP
//! service that proxies calls to an emotional-analysis provider.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod provider;

pub use config::ServiceConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
pub use observability::{MetricsRecorder, TraceRegistry};
