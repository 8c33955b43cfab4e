//! Shared utilities for integration tests.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt::Debug;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use emotion_gateway::{AppState, ServiceConfig};

/// A log event captured during a test.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
    pub fields: HashMap<String, String>,
}

#[derive(Default)]
#[allow(dead_code)]
struct FieldVisitor {
    message: String,
    fields: HashMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        let value = format!("{:?}", value);
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

/// Layer that records every event for later assertions.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

#[allow(dead_code)]
impl LogCapture {
    /// Install as the thread-local default subscriber.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::registry().with(self.clone());
        tracing::subscriber::set_default(subscriber)
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Events with `message` whose `correlation_id` field equals `id`.
    pub fn for_correlation(&self, message: &str, id: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.message == message)
            .filter(|e| e.fields.get("correlation_id").map(String::as_str) == Some(id))
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

#[derive(Clone)]
struct MockProvider {
    status: u16,
    delay: Duration,
}

async fn mock_analyze(
    State(mock): State<MockProvider>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    tokio::time::sleep(mock.delay).await;
    let correlation_id = headers
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let status = StatusCode::from_u16(mock.status).unwrap();
    (
        status,
        Json(json!({
            "emotions": [{"name": "joy", "score": 0.91}],
            "echo": payload,
            "correlation_id": correlation_id,
        })),
    )
}

/// Start a mock provider answering every analysis call with `status`.
#[allow(dead_code)]
pub async fn start_mock_provider(status: u16, delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new()
        .route("/text", post(mock_analyze))
        .route("/batch", post(mock_analyze))
        .with_state(MockProvider { status, delay });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Gateway state pointing at an optional provider address.
#[allow(dead_code)]
pub fn test_state(provider: Option<SocketAddr>) -> AppState {
    let mut config = ServiceConfig::default();
    config.observability.service_name = "emotion-gateway-test".to_string();
    config.provider.base_url = provider.map(|addr| format!("http://{}", addr));
    config.provider.timeout_secs = 5;
    AppState::new(config).unwrap()
}
