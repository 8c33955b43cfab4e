use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Inspection CLI for the emotion gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3001")]
    url: String,

    /// Correlation ID to send with the request.
    #[arg(long)]
    correlation_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show observability status
    Status,
    /// Dump Prometheus metrics
    Metrics,
    /// Check gateway health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let path = match cli.command {
        Commands::Status => "/api/observability/status",
        Commands::Metrics => "/metrics",
        Commands::Health => "/health",
    };

    let mut request = client.get(format!("{}{}", cli.url.trim_end_matches('/'), path));
    if let Some(id) = &cli.correlation_id {
        request = request.header("x-correlation-id", id);
    }
    let res = request.send().await?;

    if let Some(id) = res.headers().get("x-correlation-id").and_then(|v| v.to_str().ok()) {
        eprintln!("x-correlation-id: {}", id);
    }

    match cli.command {
        Commands::Metrics => print_text(res).await,
        _ => print_json(res).await,
    }
}

async fn print_text(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let body = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        eprintln!("Response: {}", body);
        return Ok(());
    }
    print!("{}", body);
    Ok(())
}

async fn print_json(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
