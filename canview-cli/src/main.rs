//! ## canview-cli
//! **Operational front end**
//!
//! One binary for every process role: the relay hub, a headless dashboard,
//! one-shot producers and the frame monitor replay.

use clap::Parser;

use canview_telemetry::EventLogger;

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;
    EventLogger::init(&config.telemetry.log_level);

    match cli.command {
        Commands::Relay => commands::run_relay(&config).await,
        Commands::Dashboard => commands::run_dashboard(&config).await,
        Commands::Publish(args) => commands::run_publish(&config, args).await,
        Commands::Monitor(args) => commands::run_monitor(&config, args).await,
    }
}
