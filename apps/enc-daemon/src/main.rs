//! One-time-pad encryption daemon
//!
//! Listens on `0.0.0.0:<port>` and encrypts one request per connection.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use pad_service::{Daemon, DaemonConfig};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "otp_enc_d")]
#[command(about = "One-time-pad encryption daemon", long_about = None)]
#[command(version)]
struct Cli {
    /// Port to listen on
    port: u16,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("otp_enc_d={level}").parse()?)
                .add_directive(format!("pad_service={level}").parse()?)
                .add_directive(format!("net_transport={level}").parse()?),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => DaemonConfig::default(),
    };
    config.bind_addr.set_port(cli.port);

    info!("Starting encryption daemon");
    let daemon = Daemon::bind(config)
        .await
        .with_context(|| format!("Failed to bind port {}", cli.port))?;

    daemon.run_until(shutdown_signal()).await?;
    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<DaemonConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
