//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize subsystems (metrics exporter, provider client)
//! - Bind the listener
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use std::path::Path;
use tokio::net::TcpListener;

use crate::config::{load_config, ConfigError, ServiceConfig};
use crate::http::HttpServer;
use crate::observability::MetricsError;
use crate::provider::ProviderError;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("metrics initialization failed: {0}")]
    Metrics(#[from] MetricsError),
    #[error("provider client initialization failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),
}

/// Load the config file, or fall back to defaults when none is given.
pub fn resolve_config(path: Option<&Path>) -> Result<ServiceConfig, StartupError> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => Ok(ServiceConfig::default()),
    }
}

/// Build the server and bind its listener.
pub async fn prepare(config: ServiceConfig) -> Result<(HttpServer, TcpListener), StartupError> {
    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?;
    let listener = TcpListener::bind(&bind_address).await?;
    Ok((server, listener))
}
