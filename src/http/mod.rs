//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → middleware/correlation.rs (correlation ID, trace context, metrics)
//!     → request.rs (RequestContext in extensions)
//!     → handlers.rs (health, metrics, status, analysis)
//!     → response.rs (correlation/service headers, error mapping)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestContext, X_CORRELATION_ID, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
