//! Request-side correlation handling.
//!
//! # Responsibilities
//! - Resolve the correlation ID (inbound header or freshly generated)
//! - Extract trace attributes (user, session) from headers
//! - Attach a `RequestContext` to request extensions for downstream handlers
//!
//! # Design Decisions
//! - `x-correlation-id` wins over `x-request-id`; empty values are ignored
//! - Resolution happens as early as possible so every log line carries the ID

use axum::http::{HeaderMap, HeaderName};

use crate::observability::ids::{generate_correlation_id, now_millis};
use crate::observability::TraceAttributes;

pub const X_CORRELATION_ID: HeaderName = HeaderName::from_static("x-correlation-id");
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
pub const X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");
pub const X_SESSION_ID: HeaderName = HeaderName::from_static("x-session-id");

/// Per-request values made available to handlers via extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub correlation_id: String,
    /// Milliseconds since the Unix epoch when the interceptor saw the request.
    pub start_time: u64,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

impl RequestContext {
    /// Build the context from inbound headers, generating an ID if none was supplied.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            correlation_id: resolve_correlation_id(headers),
            start_time: now_millis(),
            user_id: header_string(headers, &X_USER_ID),
            session_id: header_string(headers, &X_SESSION_ID),
        }
    }

    /// Trace attributes derived from the request.
    pub fn attributes(&self) -> TraceAttributes {
        TraceAttributes {
            user_id: self.user_id.clone(),
            session_id: self.session_id.clone(),
            ..Default::default()
        }
    }
}

/// First non-empty of `x-correlation-id`, `x-request-id`, else a new UUID.
pub fn resolve_correlation_id(headers: &HeaderMap) -> String {
    header_string(headers, &X_CORRELATION_ID)
        .or_else(|| header_string(headers, &X_REQUEST_ID))
        .unwrap_or_else(generate_correlation_id)
}

fn header_string(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_correlation_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(X_CORRELATION_ID, HeaderValue::from_static("abc-123"));
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("other"));
        assert_eq!(resolve_correlation_id(&headers), "abc-123");
    }

    #[test]
    fn test_request_id_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(X_CORRELATION_ID, HeaderValue::from_static(""));
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("req-9"));
        assert_eq!(resolve_correlation_id(&headers), "req-9");
    }

    #[test]
    fn test_generated_when_absent() {
        let headers = HeaderMap::new();
        let first = resolve_correlation_id(&headers);
        let second = resolve_correlation_id(&headers);
        assert_eq!(first.len(), 36);
        assert_ne!(first, second);
    }

    #[test]
    fn test_context_attributes() {
        let mut headers = HeaderMap::new();
        headers.insert(X_USER_ID, HeaderValue::from_static("user-7"));
        headers.insert(X_SESSION_ID, HeaderValue::from_static("sess-1"));

        let ctx = RequestContext::from_headers(&headers);
        let attrs = ctx.attributes();
        assert_eq!(attrs.user_id.as_deref(), Some("user-7"));
        assert_eq!(attrs.session_id.as_deref(), Some("sess-1"));
        assert!(attrs.provider.is_none());
    }
}
