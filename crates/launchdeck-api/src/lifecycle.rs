//! Manual task runs.
//!
//! A run moves the task `idle|error -> running -> idle|error`. Each step is
//! persisted before its event is broadcast. The run lives in its own task, so
//! a caller that goes away does not cut it short.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use chrono::Utc;
use tokio::process::Command;
use tracing::{info, warn};

use launchdeck_config::RunnerConfig;

use crate::error::ApiError;
use crate::registry::{TaskRecord, TaskRegistry, TaskStatus};
use crate::websocket::{BroadcastHub, Event};

/// Result of a run whose script exited with status 0.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub task: TaskRecord,
    pub output: String,
    pub stderr: String,
}

/// Why a script did not complete normally.
#[derive(Debug)]
struct ScriptFailure {
    message: String,
    output: String,
    stderr: String,
}

/// Executes a task's script and tracks its status in the registry.
#[derive(Clone)]
pub struct TaskRunner {
    registry: Arc<TaskRegistry>,
    hub: Arc<BroadcastHub>,
    interpreter: String,
    working_dir: Option<PathBuf>,
}

impl TaskRunner {
    pub fn new(registry: Arc<TaskRegistry>, hub: Arc<BroadcastHub>, config: &RunnerConfig) -> Self {
        Self {
            registry,
            hub,
            interpreter: config.interpreter.clone(),
            working_dir: config.working_dir.clone(),
        }
    }

    /// Run the task to completion.
    ///
    /// There is no timeout; the call returns when the script exits. Dropping
    /// the returned future detaches from the run without stopping it.
    pub async fn run(&self, id: &str) -> Result<RunOutcome, ApiError> {
        let runner = self.clone();
        let id = id.to_string();
        tokio::spawn(async move { runner.run_to_completion(&id).await })
            .await
            .map_err(|e| ApiError::Internal(format!("Task run aborted: {}", e)))?
    }

    async fn run_to_completion(&self, id: &str) -> Result<RunOutcome, ApiError> {
        let task = self.registry.mark_running(id, Utc::now()).await?;
        self.hub.broadcast(&Event::TaskStarted { task: task.clone() });
        info!("Running task {}: {}", id, task.script_path);

        match self.execute(&task.script_path).await {
            Ok((output, stderr)) => {
                let task = self.registry.set_status(id, TaskStatus::Idle).await?;
                self.hub.broadcast(&Event::TaskCompleted {
                    task: task.clone(),
                    output: output.clone(),
                });
                info!("Task {} completed", id);
                Ok(RunOutcome {
                    task,
                    output,
                    stderr,
                })
            }
            Err(failure) => {
                let task = self.registry.set_status(id, TaskStatus::Error).await?;
                self.hub.broadcast(&Event::TaskError {
                    task,
                    error: failure.message.clone(),
                });
                warn!("Task {} failed: {}", id, failure.message);
                Err(ApiError::Execution {
                    message: failure.message,
                    output: failure.output,
                    stderr: failure.stderr,
                })
            }
        }
    }

    /// Spawn the script and buffer its output until it exits.
    ///
    /// The child is only killed if the runtime shuts down mid-run.
    async fn execute(&self, script_path: &str) -> Result<(String, String), ScriptFailure> {
        if script_path.trim().is_empty() {
            return Err(ScriptFailure {
                message: "Task has no scriptPath".to_string(),
                output: String::new(),
                stderr: String::new(),
            });
        }

        let script = shellexpand::tilde(script_path).into_owned();
        let mut command = if self.interpreter.is_empty() {
            Command::new(&script)
        } else {
            let mut command = Command::new(&self.interpreter);
            command.arg(&script);
            command
        };
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let display = if self.interpreter.is_empty() {
            script.clone()
        } else {
            format!("{} {}", self.interpreter, script)
        };

        let child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ScriptFailure {
                message: format!("Failed to start {}: {}", display, e),
                output: String::new(),
                stderr: String::new(),
            })?;

        let output = child.wait_with_output().await.map_err(|e| ScriptFailure {
            message: format!("Failed to wait for {}: {}", display, e),
            output: String::new(),
            stderr: String::new(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            return Ok((stdout, stderr));
        }

        let status = match output.status.code() {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        let mut message = format!("Command failed ({}): {}", status, display);
        if !stderr.trim().is_empty() {
            message.push('\n');
            message.push_str(stderr.trim_end());
        }
        Err(ScriptFailure {
            message,
            output: stdout,
            stderr,
        })
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
