//! CLI definitions for launchdeck.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// launchdeck CLI.
#[derive(Parser)]
#[command(name = "launchdeck")]
#[command(about = "Control plane for periodic launchd agents")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        env = "LAUNCHDECK_CONFIG",
        default_value = "config/launchdeck.toml",
        global = true
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the HTTP and WebSocket server in foreground (default)
    Run {
        /// Server host, overrides `[server] host`
        #[arg(long)]
        host: Option<String>,

        /// Server port, overrides `[server] port`
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print owned LaunchAgents with their live launchd status
    Agents,

    /// Load and validate the configuration file
    CheckConfig,
}
