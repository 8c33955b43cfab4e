//! Response handling and transformation.
//!
//! # Responsibilities
//! - Tag responses with correlation and service headers
//! - Map provider errors to HTTP status codes
//!
//! # Design Decisions
//! - Tagging never fails: values that are not valid header text are skipped
//! - Error bodies are JSON and carry the message only, never upstream payloads

use axum::{
    http::{HeaderMap, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};

use crate::http::request::{X_CORRELATION_ID, X_REQUEST_ID};
use crate::provider::ProviderError;

pub const X_SERVICE: HeaderName = HeaderName::from_static("x-service");
pub const X_ANALYSIS_TYPE: HeaderName = HeaderName::from_static("x-analysis-type");
pub const X_FEATURE: HeaderName = HeaderName::from_static("x-feature");
pub const X_HEALTH_CHECK: HeaderName = HeaderName::from_static("x-health-check");

/// Echo the correlation ID and identify the service.
pub fn tag_response_headers(headers: &mut HeaderMap, correlation_id: &str, service: &str) {
    if let Ok(value) = HeaderValue::from_str(correlation_id) {
        headers.insert(X_CORRELATION_ID, value.clone());
        headers.insert(X_REQUEST_ID, value);
    }
    if let Ok(value) = HeaderValue::from_str(service) {
        headers.insert(X_SERVICE, value);
    }
}

impl IntoResponse for ProviderError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_tag_headers() {
        let mut headers = HeaderMap::new();
        tag_response_headers(&mut headers, "abc-123", "emotion-gateway");

        assert_eq!(headers[&X_CORRELATION_ID], "abc-123");
        assert_eq!(headers[&X_REQUEST_ID], "abc-123");
        assert_eq!(headers[&X_SERVICE], "emotion-gateway");
    }

    #[test]
    fn test_provider_error_response() {
        let response = ProviderError::Status { status: 429 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
