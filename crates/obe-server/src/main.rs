use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use obe_server::{serve, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "obe-server", about = "Adaptive Bayesian experiment design server")]
struct Cli {
    /// TOML configuration; built-in Lorentzian demo when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the listen address.
    #[arg(long)]
    address: Option<String>,
    /// Override the listen port.
    #[arg(long)]
    port: Option<u16>,
    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(address) = cli.address {
        config.server.address = address;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.validate()?;

    if cli.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    info!(
        fingerprint = %config.fingerprint()?,
        address = %config.bind_address(),
        "configuration loaded"
    );
    let summary = serve(&config)?;
    info!(commands = summary.commands, errors = summary.errors, "server finished");
    Ok(())
}
