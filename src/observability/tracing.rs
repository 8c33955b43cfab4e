//! Trace-context registry.
//!
//! # Responsibilities
//! - Open a trace context per correlation ID
//! - Look up the in-flight context for log/metric enrichment
//! - Close the context exactly once (success or error) and log the outcome
//! - Scope an async operation between open and close (`with_trace`)
//!
//! # Design Decisions
//! - Explicitly constructed and shared via `Arc` in `AppState`; no global map
//! - Contexts are cloned out on read; only the registry mutates entries
//! - Duplicate `create` on a live ID overwrites (last writer wins) and logs a warning
//! - Finishing an unknown ID is a silent no-op
//! - Contexts whose finish never runs stay until restart; there is no reaper

use dashmap::DashMap;
use serde::Serialize;
use std::any::type_name;
use std::error::Error;
use std::future::Future;

use crate::observability::ids::{generate_request_id, now_millis};

/// Optional attributes attached to a trace context at creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceAttributes {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub provider: Option<String>,
    /// Correlation ID of the enclosing request, for derived operations.
    pub parent_id: Option<String>,
}

impl TraceAttributes {
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

/// One in-flight traced operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceContext {
    pub correlation_id: String,
    pub request_id: String,
    pub operation: String,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub provider: Option<String>,
    pub parent_id: Option<String>,
    /// Creation time, milliseconds since the Unix epoch.
    pub start_time: u64,
}

/// A context removed from the registry by a finish call.
#[derive(Debug, Clone)]
pub struct CompletedTrace {
    pub context: TraceContext,
    pub duration_ms: u64,
    pub success: bool,
}

/// Reason recorded when a scoped trace is released without an explicit outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TraceAborted {
    #[error("operation panicked")]
    Panicked,
    #[error("operation dropped before completion")]
    Cancelled,
}

/// Registry of in-flight trace contexts keyed by correlation ID.
#[derive(Debug, Default)]
pub struct TraceRegistry {
    contexts: DashMap<String, TraceContext>,
}

impl TraceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and store a context, replacing any live context under the same ID.
    pub fn create(
        &self,
        correlation_id: &str,
        operation: &str,
        attributes: TraceAttributes,
    ) -> TraceContext {
        let context = TraceContext {
            correlation_id: correlation_id.to_string(),
            request_id: generate_request_id(),
            operation: operation.to_string(),
            user_id: attributes.user_id,
            session_id: attributes.session_id,
            provider: attributes.provider,
            parent_id: attributes.parent_id,
            start_time: now_millis(),
        };

        if let Some(previous) = self
            .contexts
            .insert(correlation_id.to_string(), context.clone())
        {
            tracing::warn!(
                correlation_id = %correlation_id,
                previous_request_id = %previous.request_id,
                previous_operation = %previous.operation,
                "Trace context overwritten"
            );
        }

        tracing::info!(
            correlation_id = %context.correlation_id,
            request_id = %context.request_id,
            operation = %context.operation,
            user_id = context.user_id.as_deref(),
            session_id = context.session_id.as_deref(),
            provider = context.provider.as_deref(),
            parent_id = context.parent_id.as_deref(),
            "Trace started"
        );

        context
    }

    /// Look up the live context for `correlation_id`.
    pub fn get(&self, correlation_id: &str) -> Option<TraceContext> {
        self.contexts.get(correlation_id).map(|r| r.value().clone())
    }

    /// Close a trace as successful.
    ///
    /// `result_kind` is a coarse descriptor of the result (e.g. its type name);
    /// payloads are never logged.
    pub fn finish_success(
        &self,
        correlation_id: &str,
        result_kind: Option<&str>,
    ) -> Option<CompletedTrace> {
        let (_, context) = self.contexts.remove(correlation_id)?;
        let duration_ms = now_millis().saturating_sub(context.start_time);

        tracing::info!(
            correlation_id = %context.correlation_id,
            request_id = %context.request_id,
            operation = %context.operation,
            duration_ms,
            result_kind = result_kind.unwrap_or("none"),
            success = true,
            "Trace completed"
        );

        Some(CompletedTrace {
            context,
            duration_ms,
            success: true,
        })
    }

    /// Close a trace as failed, logging the error and its source chain.
    pub fn finish_error<E>(&self, correlation_id: &str, error: &E) -> Option<CompletedTrace>
    where
        E: Error + ?Sized,
    {
        let (_, context) = self.contexts.remove(correlation_id)?;
        let duration_ms = now_millis().saturating_sub(context.start_time);
        let chain: Vec<String> = std::iter::successors(error.source(), |&e| e.source())
            .map(|e| e.to_string())
            .collect();

        tracing::error!(
            correlation_id = %context.correlation_id,
            request_id = %context.request_id,
            operation = %context.operation,
            duration_ms,
            error = %error,
            error_type = type_name::<E>(),
            error_chain = %chain.join(" <- "),
            success = false,
            "Trace failed"
        );

        Some(CompletedTrace {
            context,
            duration_ms,
            success: false,
        })
    }

    /// Open a trace and return a guard that closes it.
    ///
    /// Dropping the guard without `succeed`/`fail` closes the trace as an error.
    pub fn start(
        &self,
        correlation_id: &str,
        operation: &str,
        attributes: TraceAttributes,
    ) -> TraceGuard<'_> {
        self.create(correlation_id, operation, attributes);
        TraceGuard {
            registry: self,
            correlation_id: correlation_id.to_string(),
            armed: true,
        }
    }

    /// Run `f` inside a trace. The trace is closed on every exit path and the
    /// operation's own result is returned unchanged.
    pub async fn with_trace<F, Fut, T, E>(
        &self,
        correlation_id: &str,
        operation: &str,
        attributes: TraceAttributes,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Error,
    {
        let guard = self.start(correlation_id, operation, attributes);
        match f().await {
            Ok(value) => {
                guard.succeed(Some(type_name::<T>()));
                Ok(value)
            }
            Err(err) => {
                guard.fail(&err);
                Err(err)
            }
        }
    }

    /// Number of in-flight contexts.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

/// RAII handle for a trace opened with [`TraceRegistry::start`].
#[derive(Debug)]
pub struct TraceGuard<'a> {
    registry: &'a TraceRegistry,
    correlation_id: String,
    armed: bool,
}

impl TraceGuard<'_> {
    pub fn succeed(mut self, result_kind: Option<&str>) -> Option<CompletedTrace> {
        self.armed = false;
        self.registry.finish_success(&self.correlation_id, result_kind)
    }

    pub fn fail<E>(mut self, error: &E) -> Option<CompletedTrace>
    where
        E: Error + ?Sized,
    {
        self.armed = false;
        self.registry.finish_error(&self.correlation_id, error)
    }
}

impl Drop for TraceGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let reason = if std::thread::panicking() {
            TraceAborted::Panicked
        } else {
            TraceAborted::Cancelled
        };
        self.registry.finish_error(&self.correlation_id, &reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tracing::field::{Field, Visit};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    #[derive(Debug, PartialEq, thiserror::Error)]
    #[error("upstream exploded: {0}")]
    struct Boom(u32);

    #[test]
    fn test_create_then_get() {
        let registry = TraceRegistry::new();
        let attrs = TraceAttributes {
            user_id: Some("u-1".into()),
            ..Default::default()
        };
        let created = registry.create("abc-123", "GET /health", attrs);

        let found = registry.get("abc-123").unwrap();
        assert_eq!(found, created);
        assert_eq!(found.correlation_id, "abc-123");
        assert_eq!(found.operation, "GET /health");
        assert_eq!(found.user_id.as_deref(), Some("u-1"));
        assert!(found.start_time <= now_millis());
        assert!(found.request_id.starts_with("req_"));
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let registry = TraceRegistry::new();
        assert!(registry.get("missing").is_none());
        assert!(registry.finish_success("missing", None).is_none());
        assert!(registry.finish_error("missing", &Boom(1)).is_none());
    }

    #[test]
    fn test_finish_success_removes_context() {
        let registry = TraceRegistry::new();
        registry.create("id-1", "op", TraceAttributes::default());

        let done = registry.finish_success("id-1", Some("Value")).unwrap();
        assert!(done.success);
        assert_eq!(done.context.operation, "op");
        assert!(registry.get("id-1").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_finish_error_removes_context() {
        let registry = TraceRegistry::new();
        registry.create("id-2", "op", TraceAttributes::default());

        let done = registry.finish_error("id-2", &Boom(7)).unwrap();
        assert!(!done.success);
        assert!(registry.get("id-2").is_none());
    }

    /// Records each event's message and `error_chain` field.
    #[derive(Clone, Default)]
    struct EventLog(Arc<Mutex<Vec<(String, Option<String>)>>>);

    #[derive(Default)]
    struct EventVisitor {
        message: Option<String>,
        error_chain: Option<String>,
    }

    impl Visit for EventVisitor {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            match field.name() {
                "message" => self.message = Some(format!("{:?}", value)),
                "error_chain" => self.error_chain = Some(format!("{:?}", value)),
                _ => {}
            }
        }
    }

    impl<S: Subscriber> Layer<S> for EventLog {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut visitor = EventVisitor::default();
            event.record(&mut visitor);
            if let Some(message) = visitor.message {
                self.0.lock().unwrap().push((message, visitor.error_chain));
            }
        }
    }

    impl EventLog {
        fn install(&self) -> tracing::subscriber::DefaultGuard {
            tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
        }

        fn count(&self, message: &str) -> usize {
            self.0.lock().unwrap().iter().filter(|(m, _)| m == message).count()
        }

        fn error_chain(&self) -> Option<String> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .find(|(m, _)| m == "Trace failed")
                .and_then(|(_, chain)| chain.clone())
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("provider call failed")]
    struct Wrapped(#[source] Boom);

    #[test]
    fn test_finish_error_logs_source_chain() {
        let log = EventLog::default();
        let _guard = log.install();
        let registry = TraceRegistry::new();
        registry.create("chain-id", "op", TraceAttributes::default());

        assert!(registry.finish_error("chain-id", &Wrapped(Boom(502))).is_some());
        assert_eq!(log.count("Trace failed"), 1);
        assert_eq!(log.error_chain().as_deref(), Some("upstream exploded: 502"));
    }

    #[test]
    fn test_double_finish_is_noop() {
        let log = EventLog::default();
        let _guard = log.install();
        let registry = TraceRegistry::new();
        registry.create("id-3", "op", TraceAttributes::default());

        assert!(registry.finish_success("id-3", None).is_some());
        assert!(registry.finish_success("id-3", None).is_none());
        assert!(registry.finish_error("id-3", &Boom(0)).is_none());

        assert_eq!(log.count("Trace started"), 1);
        assert_eq!(log.count("Trace completed"), 1);
        assert_eq!(log.count("Trace failed"), 0);
    }

    #[test]
    fn test_duplicate_create_overwrites() {
        let registry = TraceRegistry::new();
        registry.create("dup", "first", TraceAttributes::default());
        registry.create("dup", "second", TraceAttributes::default());

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("dup").unwrap().operation, "second");
    }

    #[tokio::test]
    async fn test_with_trace_success() {
        let registry = TraceRegistry::new();
        let out: Result<u32, Boom> = registry
            .with_trace("ok-id", "compute", TraceAttributes::default(), || async {
                Ok(42)
            })
            .await;

        assert_eq!(out, Ok(42));
        assert!(registry.get("ok-id").is_none());
    }

    #[tokio::test]
    async fn test_with_trace_returns_error_unchanged() {
        let registry = TraceRegistry::new();
        let out: Result<(), Boom> = registry
            .with_trace("err-id", "compute", TraceAttributes::default(), || async {
                Err(Boom(429))
            })
            .await;

        assert_eq!(out, Err(Boom(429)));
        assert!(registry.get("err-id").is_none());
    }

    #[tokio::test]
    async fn test_with_trace_context_visible_during_operation() {
        let registry = Arc::new(TraceRegistry::new());
        let inner = registry.clone();
        let attrs = TraceAttributes::default().with_provider("hume");

        let seen: Result<Option<TraceContext>, Boom> = registry
            .with_trace("live-id", "analyze", attrs, || async move {
                Ok(inner.get("live-id"))
            })
            .await;

        let seen = seen.unwrap().unwrap();
        assert_eq!(seen.provider.as_deref(), Some("hume"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_with_trace_released_on_panic() {
        let registry = Arc::new(TraceRegistry::new());
        let task_registry = registry.clone();

        let handle = tokio::spawn(async move {
            let _: Result<(), Boom> = task_registry
                .with_trace("panic-id", "compute", TraceAttributes::default(), || async {
                    if true {
                        panic!("provider client bug");
                    }
                    Ok(())
                })
                .await;
        });

        let err = handle.await.unwrap_err();
        assert!(err.is_panic());
        assert!(registry.get("panic-id").is_none());
    }

    #[tokio::test]
    async fn test_with_trace_released_on_cancellation() {
        let registry = TraceRegistry::new();
        let fut = registry.with_trace("slow-id", "compute", TraceAttributes::default(), || async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<(), Boom>(())
        });

        let timed_out = tokio::time::timeout(Duration::from_millis(10), fut).await;
        assert!(timed_out.is_err());
        assert!(registry.get("slow-id").is_none());
    }
}
