//! Emotion-analysis gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                  EMOTION GATEWAY                     │
//!   Client Request     │  ┌────────────┐   ┌──────────────┐   ┌────────────┐  │
//!   ───────────────────┼─▶│ correlation│──▶│   handlers   │──▶│  provider  │──┼──▶ Provider
//!                      │  │ interceptor│   │              │   │   client   │  │     API
//!   Client Response    │  └─────┬──────┘   └──────┬───────┘   └────────────┘  │
//!   ◀──────────────────┼────────┘                 │ with_trace                 │
//!                      │        │                 ▼                            │
//!                      │  ┌─────▼──────┐   ┌──────────────┐   ┌────────────┐  │
//!                      │  │  metrics   │   │trace registry│   │   status   │  │
//!                      │  │  recorder  │   │              │   │  reporter  │  │
//!                      │  └────────────┘   └──────────────┘   └────────────┘  │
//!                      └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use emotion_gateway::lifecycle::{signals, startup, Shutdown};
use emotion_gateway::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "emotion-gateway")]
#[command(about = "Emotion-analysis gateway with request tracing and metrics", long_about = None)]
struct Args {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = startup::resolve_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config_file = ?args.config,
        "emotion-gateway starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        metrics_enabled = config.observability.metrics_enabled,
        tracing_enabled = config.observability.tracing_enabled,
        provider = %config.provider.name,
        provider_configured = config.provider.base_url.is_some(),
        "Configuration loaded"
    );

    let (server, listener) = startup::prepare(config).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server_task = tokio::spawn(server.run(listener, server_shutdown));

    signals::shutdown_on_signal(&shutdown).await;
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
