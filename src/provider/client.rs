//! HTTP client for the emotional-analysis provider.

use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::http::request::X_CORRELATION_ID;

/// Analysis endpoint exposed by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    Text,
    Batch,
}

impl AnalysisKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisKind::Text => "text",
            AnalysisKind::Batch => "batch",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider is not configured")]
    NotConfigured,
    #[error("failed to build provider client")]
    Build(#[source] reqwest::Error),
    #[error("provider returned status {status}")]
    Status { status: u16 },
    #[error("provider request timed out")]
    Timeout(#[source] reqwest::Error),
    #[error("provider request failed")]
    Transport(#[source] reqwest::Error),
    #[error("invalid provider response")]
    Decode(#[source] reqwest::Error),
}

impl ProviderError {
    fn from_send(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(err)
        } else {
            ProviderError::Transport(err)
        }
    }

    /// Status code returned to the gateway's caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProviderError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            ProviderError::Status { status: 429 } => StatusCode::TOO_MANY_REQUESTS,
            ProviderError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProviderError::Build(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProviderError::Status { .. }
            | ProviderError::Transport(_)
            | ProviderError::Decode(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Metric label for the call outcome.
    pub fn outcome(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured | ProviderError::Build(_) => "unavailable",
            ProviderError::Status { status: 429 } => "rate_limited",
            ProviderError::Status { .. } => "upstream_error",
            ProviderError::Timeout(_) => "timeout",
            ProviderError::Transport(_) => "transport_error",
            ProviderError::Decode(_) => "decode_error",
        }
    }
}

/// Client for the configured provider.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    name: String,
    base_url: Option<String>,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl ProviderClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ProviderError::Build)?;

        Ok(Self {
            name: config.name.clone(),
            base_url: config
                .base_url
                .as_ref()
                .map(|u| u.trim_end_matches('/').to_string()),
            api_key: config.api_key.clone(),
            http,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// Forward `payload` to the provider's `kind` endpoint.
    pub async fn analyze(
        &self,
        kind: AnalysisKind,
        correlation_id: &str,
        payload: &Value,
    ) -> Result<Value, ProviderError> {
        let base_url = self.base_url.as_ref().ok_or(ProviderError::NotConfigured)?;
        let url = format!("{}/{}", base_url, kind.as_str());

        let mut request = self
            .http
            .post(url)
            .header(X_CORRELATION_ID, correlation_id)
            .json(payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(ProviderError::from_send)?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                provider = %self.name,
                correlation_id = %correlation_id,
                status = status.as_u16(),
                "Provider returned error status"
            );
            return Err(ProviderError::Status {
                status: status.as_u16(),
            });
        }

        response.json::<Value>().await.map_err(ProviderError::Decode)
    }
}
