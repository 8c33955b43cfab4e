//! Correlation and instrumentation interceptor.
//!
//! # State Machine
//! ```text
//! Started ──▶ InFlight ──▶ FinishedOk      (status < 400)
//!                     └──▶ FinishedError   (status >= 400)
//! ```
//!
//! # Responsibilities
//! - Resolve the correlation ID and attach `RequestContext`
//! - Open a trace context and count the request as active
//! - On completion record metrics, close the trace, release the gauge
//! - Tag responses with correlation/service headers
//!
//! # Design Decisions
//! - Completion is the inner service producing a response
//! - A request whose future is dropped before completion never finishes:
//!   its trace context and gauge increment remain until restart
//! - Health checks only get header tagging

use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::http::request::RequestContext;
use crate::http::response::{tag_response_headers, X_HEALTH_CHECK};
use crate::http::server::AppState;

/// Synthetic error recorded for responses with status >= 400.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("HTTP {status}")]
pub struct HttpStatusError {
    pub status: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Started,
    InFlight,
    FinishedOk,
    FinishedError,
}

/// Bookkeeping for one instrumented request.
#[derive(Debug)]
pub struct RequestLifecycle {
    context: RequestContext,
    method: String,
    route: String,
    started: Instant,
    traced: bool,
    phase: RequestState,
}

impl RequestLifecycle {
    /// Enter `Started`: resolve identity and attach it to the request.
    pub fn start(request: &mut Request) -> Self {
        let context = RequestContext::from_headers(request.headers());
        request.extensions_mut().insert(context.clone());

        Self {
            context,
            method: request.method().to_string(),
            route: route_label(request),
            started: Instant::now(),
            traced: false,
            phase: RequestState::Started,
        }
    }

    /// `Started → InFlight`: open the trace context and count the request.
    pub fn begin(&mut self, state: &AppState, path: &str) {
        debug_assert_eq!(self.phase, RequestState::Started);

        if state.config.observability.tracing_enabled {
            let operation = format!("{} {}", self.method, path);
            state
                .traces
                .create(&self.context.correlation_id, &operation, self.context.attributes());
            self.traced = true;
        }
        state.metrics.increment_active_connections();
        self.phase = RequestState::InFlight;
    }

    /// `InFlight → FinishedOk | FinishedError`.
    pub fn finish(mut self, state: &AppState, status: StatusCode) -> RequestState {
        debug_assert_eq!(self.phase, RequestState::InFlight);

        state
            .metrics
            .record_request(&self.method, &self.route, status.as_u16(), self.started);

        self.phase = if status.as_u16() >= 400 {
            if self.traced {
                let error = HttpStatusError {
                    status: status.as_u16(),
                };
                state.traces.finish_error(&self.context.correlation_id, &error);
            }
            RequestState::FinishedError
        } else {
            if self.traced {
                state
                    .traces
                    .finish_success(&self.context.correlation_id, Some("http_response"));
            }
            RequestState::FinishedOk
        };

        state.metrics.decrement_active_connections();

        tracing::debug!(
            correlation_id = %self.context.correlation_id,
            method = %self.method,
            route = %self.route,
            status = status.as_u16(),
            duration_ms = self.started.elapsed().as_millis() as u64,
            "Request completed"
        );

        self.phase
    }

    pub fn correlation_id(&self) -> &str {
        &self.context.correlation_id
    }

    pub fn state(&self) -> RequestState {
        self.phase
    }
}

/// Matched route pattern, else the raw path, else `"unknown"`.
///
/// Unmatched paths are used verbatim, so each distinct 404 path adds a
/// metric series that lives for the process lifetime.
pub fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .or_else(|| {
            let path = request.uri().path();
            (!path.is_empty()).then(|| path.to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Full instrumentation interceptor.
pub async fn trace_requests(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let mut lifecycle = RequestLifecycle::start(&mut request);
    lifecycle.begin(&state, &path);

    let correlation_id = lifecycle.correlation_id().to_string();
    let mut response = next.run(request).await;

    lifecycle.finish(&state, response.status());
    tag_response_headers(
        response.headers_mut(),
        &correlation_id,
        &state.config.observability.service_name,
    );
    response
}

/// Reduced interceptor for health checks: headers only, no trace, no metrics.
pub async fn tag_health_check(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let context = RequestContext::from_headers(request.headers());
    let correlation_id = context.correlation_id.clone();
    request.extensions_mut().insert(context);

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    tag_response_headers(headers, &correlation_id, &state.config.observability.service_name);
    headers.insert(X_HEALTH_CHECK, HeaderValue::from_static("true"));
    response
}
