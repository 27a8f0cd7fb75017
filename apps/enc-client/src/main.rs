//! One-time-pad encryption client
//!
//! Sends a plaintext file and a key file to the daemon and prints the
//! ciphertext on stdout. Logs go to stderr.

use std::path::{Path, PathBuf};

use clap::Parser;
use pad_service::input::{load_key, load_text};
use pad_service::{ClientConfig, EncryptClient};
use tracing::debug;

#[derive(Parser)]
#[command(name = "otp_enc")]
#[command(about = "Encrypt a file with a one-time pad via otp_enc_d", long_about = None)]
#[command(version)]
struct Cli {
    /// File holding the plaintext
    plaintext: PathBuf,

    /// File holding the key
    key: PathBuf,

    /// Daemon port
    port: u16,

    /// Daemon host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("otp_enc={level}").parse()?)
                .add_directive(format!("pad_service={level}").parse()?)
                .add_directive(format!("net_transport={level}").parse()?),
        )
        .init();

    let plaintext = load_text(&cli.plaintext, &label(&cli.plaintext))?;
    let key = load_key(&cli.key, &label(&cli.key))?;
    debug!("Plaintext {} symbols, key {} symbols", plaintext.len(), key.len());

    let mut client = EncryptClient::new(ClientConfig::new(&cli.host, cli.port));
    let ciphertext = client.encrypt(&plaintext, &key).await?;

    println!("{ciphertext}");
    Ok(())
}

/// File name used in validation errors
fn label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
