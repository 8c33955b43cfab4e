//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (correlation interceptor, timeout, body limit, tracing)
//! - Bind server to listener
//! - Run metrics upkeep until shutdown

use axum::{
    extract::DefaultBodyLimit,
    handler::Handler,
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{set_header::SetResponseHeaderLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServiceConfig;
use crate::http::handlers;
use crate::http::middleware::{tag_health_check, trace_requests};
use crate::http::response::{X_ANALYSIS_TYPE, X_FEATURE};
use crate::lifecycle::startup::StartupError;
use crate::observability::{MetricsRecorder, TraceRegistry};
use crate::provider::ProviderClient;

/// Application state injected into handlers and interceptors.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub traces: Arc<TraceRegistry>,
    pub metrics: Arc<MetricsRecorder>,
    pub provider: ProviderClient,
}

impl AppState {
    /// Build all subsystems from configuration.
    pub fn new(config: ServiceConfig) -> Result<Self, StartupError> {
        let metrics = if config.observability.metrics_enabled {
            MetricsRecorder::new()?
        } else {
            MetricsRecorder::disabled()
        };
        let provider = ProviderClient::new(&config.provider)?;
        if !provider.is_configured() {
            tracing::warn!(
                provider = %provider.name(),
                "Provider base URL not set, analysis routes will answer 503"
            );
        }

        Ok(Self {
            config: Arc::new(config),
            traces: Arc::new(TraceRegistry::new()),
            metrics: Arc::new(metrics),
            provider,
        })
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServiceConfig) -> Result<Self, StartupError> {
        Ok(Self::with_state(AppState::new(config)?))
    }

    pub fn with_state(state: AppState) -> Self {
        let router = build_router(state.clone());
        Self { router, state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            service = %self.state.config.observability.service_name,
            "HTTP server starting"
        );

        if self.state.metrics.is_enabled() {
            let metrics = self.state.metrics.clone();
            let interval =
                Duration::from_secs(self.state.config.observability.upkeep_interval_secs);
            tokio::spawn(run_metrics_upkeep(metrics, interval, shutdown.resubscribe()));
        }

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!(
            in_flight_traces = self.state.traces.len(),
            "HTTP server stopped"
        );
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();
    let timeout = Duration::from_secs(config.timeouts.request_secs);

    let traced = Router::new()
        .route(
            "/api/analyze/text",
            post(handlers::analyze_text).layer(SetResponseHeaderLayer::overriding(
                X_ANALYSIS_TYPE,
                HeaderValue::from_static("text"),
            )),
        )
        .route(
            "/api/analyze/batch",
            post(handlers::analyze_batch).layer(SetResponseHeaderLayer::overriding(
                X_ANALYSIS_TYPE,
                HeaderValue::from_static("batch"),
            )),
        )
        .route(
            "/api/observability/status",
            get(handlers::status).layer(SetResponseHeaderLayer::overriding(
                X_FEATURE,
                HeaderValue::from_static("observability"),
            )),
        )
        .route(&config.observability.metrics_path, get(handlers::metrics))
        .route_layer(TimeoutLayer::new(timeout))
        .route_layer(middleware::from_fn_with_state(state.clone(), trace_requests));

    let health = Router::new()
        .route("/health", get(handlers::health))
        .route_layer(middleware::from_fn_with_state(state.clone(), tag_health_check));

    let not_found =
        handlers::not_found.layer(middleware::from_fn_with_state(state.clone(), trace_requests));

    traced
        .merge(health)
        .fallback(not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.listener.max_body_bytes))
        .layer(TraceLayer::new_for_http())
}

async fn run_metrics_upkeep(
    metrics: Arc<MetricsRecorder>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => metrics.run_upkeep(),
            _ = shutdown.recv() => {
                tracing::debug!("Metrics upkeep stopping");
                break;
            }
        }
    }
}
