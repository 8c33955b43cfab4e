//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;
use url::Url;

use crate::config::schema::ServiceConfig;

/// Paths owned by fixed routes; the metrics endpoint may not reuse them.
const RESERVED_PATHS: &[&str] = &[
    "/health",
    "/api/analyze/text",
    "/api/analyze/batch",
    "/api/observability/status",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),
    #[error("service name must not be empty")]
    EmptyServiceName,
    #[error("metrics path '{0}' must start with '/' and not shadow a fixed route")]
    MetricsPath(String),
    #[error("invalid provider base URL '{0}'")]
    ProviderUrl(String),
    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let obs = &config.observability;
    if obs.service_name.trim().is_empty() {
        errors.push(ValidationError::EmptyServiceName);
    }
    if !obs.metrics_path.starts_with('/') || RESERVED_PATHS.contains(&obs.metrics_path.as_str()) {
        errors.push(ValidationError::MetricsPath(obs.metrics_path.clone()));
    }
    if obs.upkeep_interval_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("observability.upkeep_interval_secs"));
    }

    if let Some(base_url) = &config.provider.base_url {
        if Url::parse(base_url).is_err() {
            errors.push(ValidationError::ProviderUrl(base_url.clone()));
        }
    }
    if config.provider.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("provider.timeout_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.request_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ServiceConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServiceConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.observability.metrics_path = "metrics".into();
        config.provider.base_url = Some("::nope".into());
        config.timeouts.request_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::MetricsPath("metrics".into())));
        assert!(errors.contains(&ValidationError::ZeroTimeout("timeouts.request_secs")));
    }

    #[test]
    fn test_metrics_path_cannot_shadow_health() {
        let mut config = ServiceConfig::default();
        config.observability.metrics_path = "/health".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MetricsPath("/health".into())]);
    }
}
