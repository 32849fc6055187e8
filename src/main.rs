use std::io::{self, Read};
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use shcdec::{Config, Verifier};

/// Decode and verify a SMART Health Card read from stdin.
///
/// The input is the text of the card's QR code, as produced by any QR
/// scanner: `shc:/` followed by digits.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Print the decoded card without checking its signature
    #[arg(long)]
    no_verify: bool,

    /// Seconds to wait for the issuer's key set (default: SHC_FETCH_TIMEOUT or 10)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

fn run(args: &Args) -> Result<bool> {
    let mut data = String::new();
    let mut stdin = io::stdin();
    stdin
        .read_to_string(&mut data)
        .context("cannot read card from stdin")?;

    let card = shcdec::decode(&data)?;
    println!("Header: {}", serde_json::to_string_pretty(&card.header)?);
    println!("Payload: {}", serde_json::to_string_pretty(&card.payload)?);
    if args.no_verify {
        return Ok(true);
    }

    let mut config = Config::from_env();
    if let Some(secs) = args.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    let verifier = Verifier::new(&config)?;
    let valid = verifier
        .verify(&card)
        .with_context(|| format!("cannot verify card signed with key '{}'", card.kid()))?;
    if valid {
        println!("Card is valid.");
    } else {
        warn!(kid = %card.kid(), "signature does not match");
        println!("WARNING: card is NOT valid.");
    }
    Ok(valid)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(2);
        }
    }
}
