//! Emotional-analysis provider integration.
//!
//! # Data Flow
//! ```text
//! analysis handler
//!     → TraceRegistry::with_trace (derived trace, parent = request correlation ID)
//!     → client.rs (POST JSON to provider, correlation header attached)
//!     → MetricsRecorder::record_provider_call
//! ```
//!
//! # Design Decisions
//! - Payloads are forwarded untouched; the gateway does not interpret analysis semantics
//! - Upstream 429 is passed through, other upstream failures become 502/504

pub mod client;

pub use client::{AnalysisKind, ProviderClient, ProviderError};
