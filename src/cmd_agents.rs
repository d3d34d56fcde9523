//! `agents` and `check-config` command handlers.

use std::path::Path;

use launchdeck_api::AppState;
use launchdeck_config::{Config, ConfigLoader, ConfigValidator};
use launchdeck_daemon::AgentStatus;
use tracing::warn;

/// Print every owned LaunchAgent with its schedule and live status.
pub(crate) async fn handle_agents_command(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::new(config);

    let labels = state.descriptors.list_labels().await?;
    if labels.is_empty() {
        println!("No LaunchAgents found in {}", state.descriptors.dir().display());
        return Ok(());
    }

    let statuses = match state.bridge.list_statuses().await {
        Ok(statuses) => statuses,
        Err(e) => {
            warn!("launchctl list failed: {}", e);
            Default::default()
        }
    };

    println!("{:<36} {:<24} {:<10} {}", "LABEL", "NAME", "STATUS", "SCHEDULE");
    for label in labels {
        let descriptor = match state.descriptors.read(&label).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                println!("{:<36} <unreadable: {}>", label, e);
                continue;
            }
        };
        let status = statuses.get(&label).copied().unwrap_or_default();
        let schedule = descriptor
            .schedules()
            .iter()
            .map(|s| s.time.clone())
            .collect::<Vec<_>>()
            .join(", ");

        println!(
            "{:<36} {:<24} {:<10} {}",
            label,
            state.display_name(&label),
            status_label(&status, descriptor.enabled),
            if schedule.is_empty() { "-" } else { &schedule }
        );
    }

    Ok(())
}

/// Load and validate the configuration, printing every finding.
pub(crate) fn handle_check_config_command(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load_or_default(path)?;
    if !path.exists() {
        println!("{} not found, checking defaults", path.display());
    }

    let result = ConfigValidator::validate(&config);
    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for err in &result.errors {
        println!("error: {}", err);
    }

    if result.is_valid() {
        println!("Configuration OK");
        Ok(())
    } else {
        Err(format!("{} configuration error(s)", result.errors.len()).into())
    }
}

pub(crate) fn status_label(status: &AgentStatus, enabled: bool) -> String {
    match (status.running, status.loaded, status.pid) {
        (true, _, Some(pid)) => format!("running:{}", pid),
        (true, _, None) => "running".to_string(),
        (false, true, _) => "loaded".to_string(),
        (false, false, _) if !enabled => "disabled".to_string(),
        _ => "unloaded".to_string(),
    }
}
