//! The chatrelay binary: load configuration, set up logging, run the relay.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::error;

use chatrelay_runtime::{ConfigLoader, Relay, logging};

// Linking the platform crates is what populates the plugin registry.
use chatrelay_plugin_irc as _;

#[derive(Parser)]
#[command(name = "chatrelay", about = "Relay chat messages between networks", version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            // Logging may not be up yet; print as well.
            error!("{error:#}");
            eprintln!("chatrelay: {error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ConfigLoader::new(&cli.config)
        .load()
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    logging::init_from_config(&config.general);

    let mut relay = Relay::new(config);
    relay.run().await.context("relay terminated with an error")?;
    Ok(())
}
