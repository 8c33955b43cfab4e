//! Route handlers.
//!
//! Health, metrics exposition, observability status and the provider-backed
//! analysis routes.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

use crate::http::request::RequestContext;
use crate::http::server::AppState;
use crate::observability::ids::{generate_correlation_id, now_millis};
use crate::observability::metrics::CONTENT_TYPE as METRICS_CONTENT_TYPE;
use crate::observability::{observability_status, ObservabilityStatus};
use crate::provider::{AnalysisKind, ProviderError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub version: &'static str,
    pub timestamp: u64,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub status: ObservabilityStatus,
    pub timestamp: u64,
    pub service: String,
    pub version: &'static str,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: state.config.observability.service_name.clone(),
        version: VERSION,
        timestamp: now_millis(),
    })
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => ([(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                "Error generating metrics",
            )
                .into_response()
        }
    }
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: observability_status(&state.config.observability, &state.metrics),
        timestamp: now_millis(),
        service: state.config.observability.service_name.clone(),
        version: VERSION,
    })
}

pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}

pub async fn analyze_text(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ProviderError> {
    run_analysis(&state, &ctx, AnalysisKind::Text, payload).await
}

pub async fn analyze_batch(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ProviderError> {
    run_analysis(&state, &ctx, AnalysisKind::Batch, payload).await
}

/// Call the provider inside a derived trace keyed by a fresh ID.
async fn run_analysis(
    state: &AppState,
    ctx: &RequestContext,
    kind: AnalysisKind,
    payload: Value,
) -> Result<Json<Value>, ProviderError> {
    let provider = &state.provider;
    let operation_id = generate_correlation_id();
    let operation = format!("provider.analyze.{}", kind.as_str());
    let attributes = ctx
        .attributes()
        .with_provider(provider.name())
        .with_parent(&ctx.correlation_id);

    let started = Instant::now();
    let result = state
        .traces
        .with_trace(&operation_id, &operation, attributes, || {
            provider.analyze(kind, &ctx.correlation_id, &payload)
        })
        .await;

    let outcome = match &result {
        Ok(_) => "success",
        Err(e) => e.outcome(),
    };
    state
        .metrics
        .record_provider_call(provider.name(), kind.as_str(), outcome, started);

    result.map(Json)
}
