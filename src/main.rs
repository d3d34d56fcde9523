//! launchdeck - control plane for periodic launchd agents
//!
//! Main entry point for the launchdeck CLI and server.

mod cli;
mod cmd_agents;
mod server;

use clap::Parser;

use launchdeck_config::ConfigLoader;

use cli::{Cli, Commands};
use cmd_agents::{handle_agents_command, handle_check_config_command};
use server::{init_tracing, run_server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Commands::CheckConfig) = cli.command {
        return handle_check_config_command(&cli.config);
    }

    let config = ConfigLoader::load_or_default(&cli.config)?;
    init_tracing(&config.logging.dir, &config.logging.level)?;

    match cli.command {
        None => run_server(config, None, None).await,
        Some(Commands::Run { host, port }) => run_server(config, host, port).await,
        Some(Commands::Agents) => handle_agents_command(config).await,
        Some(Commands::CheckConfig) => handle_check_config_command(&cli.config),
    }
}
