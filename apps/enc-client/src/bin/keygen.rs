//! Prints a random one-time-pad key

use clap::Parser;
use pad_cipher::PadKey;

#[derive(Parser)]
#[command(name = "keygen")]
#[command(about = "Generate a random key of the given length", long_about = None)]
#[command(version)]
struct Cli {
    /// Number of key symbols
    len: usize,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let key = PadKey::generate(cli.len);

    println!("{}", std::str::from_utf8(key.as_bytes())?);
    Ok(())
}
