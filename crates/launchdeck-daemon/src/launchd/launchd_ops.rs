//! launchctl bridge: load, unload, reload, trigger and status.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::DaemonError;
use super::{validate_label, CommandOutput, CommandRunner, ProcessRunner};

/// Live launchd state of one label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    /// Registered with launchd.
    pub loaded: bool,
    /// Has a live process.
    pub running: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_exit_code: Option<i32>,
}

impl AgentStatus {
    pub fn not_loaded() -> Self {
        Self::default()
    }
}

/// Stderr fragments launchctl prints when unloading something that is not loaded.
const NOT_LOADED_MARKERS: &[&str] = &[
    "Could not find specified service",
    "not loaded",
    "No such process",
];

/// The only component that shells out to launchctl.
pub struct LaunchctlBridge {
    program: String,
    agents_dir: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl LaunchctlBridge {
    pub fn new(program: impl Into<String>, agents_dir: impl Into<PathBuf>) -> Self {
        Self::with_runner(program, agents_dir, Arc::new(ProcessRunner))
    }

    pub fn with_runner(
        program: impl Into<String>,
        agents_dir: impl Into<PathBuf>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            program: program.into(),
            agents_dir: agents_dir.into(),
            runner,
        }
    }

    fn plist_path(&self, label: &str) -> Result<String, DaemonError> {
        validate_label(label)?;
        Ok(self
            .agents_dir
            .join(format!("{}.plist", label))
            .to_string_lossy()
            .into_owned())
    }

    async fn launchctl(&self, args: Vec<String>) -> Result<CommandOutput, DaemonError> {
        debug!("{} {}", self.program, args.join(" "));
        self.runner.run(&self.program, &args).await
    }

    /// Run and treat a non-zero exit, or any stderr output from load/unload, as a rejection.
    async fn launchctl_checked(&self, args: Vec<String>) -> Result<CommandOutput, DaemonError> {
        let command = args.join(" ");
        let output = self.launchctl(args).await?;
        let stderr = output.stderr.trim();
        if !output.success() || !stderr.is_empty() {
            let message = if stderr.is_empty() {
                match output.status {
                    Some(code) => format!("exit status {}", code),
                    None => "terminated by signal".to_string(),
                }
            } else {
                stderr.to_string()
            };
            return Err(DaemonError::CommandFailed { command, message });
        }
        Ok(output)
    }

    /// Live state of every job launchd knows about, keyed by label.
    pub async fn list_statuses(&self) -> Result<HashMap<String, AgentStatus>, DaemonError> {
        let output = self.launchctl(vec!["list".to_string()]).await?;
        if !output.success() {
            return Err(DaemonError::CommandFailed {
                command: "list".to_string(),
                message: output.stderr.trim().to_string(),
            });
        }
        Ok(parse_launchctl_list(&output.stdout))
    }

    /// Live state of one label. Absence from launchd is the not-loaded state.
    pub async fn query_status(&self, label: &str) -> Result<AgentStatus, DaemonError> {
        let statuses = self.list_statuses().await?;
        Ok(statuses.get(label).copied().unwrap_or_else(AgentStatus::not_loaded))
    }

    /// Load (`enabled`) or unload the job, persisting the choice across restarts.
    pub async fn set_enabled(&self, label: &str, enabled: bool) -> Result<(), DaemonError> {
        let verb = if enabled { "load" } else { "unload" };
        self.launchctl_checked(vec![verb.to_string(), "-w".to_string(), self.plist_path(label)?])
            .await?;
        info!("{} LaunchAgent: {}", if enabled { "Enabled" } else { "Disabled" }, label);
        Ok(())
    }

    /// Unload then load so launchd picks up an edited plist.
    ///
    /// An unload failure that means "not loaded" is expected and ignored. Any
    /// other unload failure is logged and the load is attempted anyway; the
    /// load result decides the outcome.
    pub async fn reload(&self, label: &str) -> Result<(), DaemonError> {
        let path = self.plist_path(label)?;

        match self.launchctl_checked(vec!["unload".to_string(), path.clone()]).await {
            Ok(_) => {}
            Err(DaemonError::CommandFailed { message, .. }) if is_not_loaded(&message) => {
                debug!("LaunchAgent {} was not loaded before reload", label);
            }
            Err(e) => warn!("Unload before reload of {} failed: {}", label, e),
        }

        self.launchctl_checked(vec!["load".to_string(), path]).await?;
        info!("Reloaded LaunchAgent: {}", label);
        Ok(())
    }

    /// Start the job now, outside its schedule.
    pub async fn trigger(&self, label: &str) -> Result<(), DaemonError> {
        validate_label(label)?;
        self.launchctl_checked(vec!["start".to_string(), label.to_string()])
            .await?;
        info!("Triggered LaunchAgent: {}", label);
        Ok(())
    }
}

fn is_not_loaded(message: &str) -> bool {
    NOT_LOADED_MARKERS.iter().any(|m| message.contains(m))
}

/// Parse `launchctl list` output (`PID  Status  Label` columns).
pub fn parse_launchctl_list(output: &str) -> HashMap<String, AgentStatus> {
    let mut statuses = HashMap::new();

    for line in output.lines() {
        let mut parts = line.split_whitespace();
        let (Some(pid), Some(status), Some(label)) = (parts.next(), parts.next(), parts.next()) else {
            continue;
        };
        if pid == "PID" {
            continue;
        }

        let pid = pid.parse::<u32>().ok();
        statuses.insert(
            label.to_string(),
            AgentStatus {
                loaded: true,
                running: pid.is_some(),
                pid,
                last_exit_code: status.parse::<i32>().ok(),
            },
        );
    }

    statuses
}
