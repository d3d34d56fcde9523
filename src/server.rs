//! Server initialization and startup logic for launchdeck.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use launchdeck_api::{ApiConfig, ApiServer, AppState};
use launchdeck_config::{Config, ConfigValidator};

/// Initialize tracing with console and file output.
///
/// Log files are written to `log_dir` with daily rotation. `RUST_LOG` takes
/// precedence over the configured level.
pub(crate) fn init_tracing(log_dir: &Path, level: &str) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("launchdeck")
        .filename_suffix("log")
        .max_log_files(14)
        .build(log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Flushes the file writer on exit.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init()?;

    Ok(())
}

/// Run the server in foreground until Ctrl+C.
pub(crate) async fn run_server(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting launchdeck v{}", env!("CARGO_PKG_VERSION"));

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let validation = ConfigValidator::validate(&config);
    for warning in &validation.warnings {
        warn!("config {}: {}", warning.path, warning.message);
    }
    if !validation.is_valid() {
        for err in &validation.errors {
            error!("config {}", err);
        }
        return Err(format!("invalid configuration ({} errors)", validation.errors.len()).into());
    }

    info!("Task catalog: {}", config.registry.path.display());
    info!(
        "LaunchAgents: {} (prefixes: {})",
        config.launchd.agents_dir.display(),
        config.launchd.label_prefixes.join(", ")
    );

    let api_config = ApiConfig::new(config.server.host.clone(), config.server.port);
    let state = Arc::new(AppState::new(config));
    let server = ApiServer::new(api_config, state);

    server.run(shutdown_signal()).await?;

    info!("launchdeck shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down..."),
        Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
    }
}
