//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub launchd: LaunchdConfig,

    #[serde(default)]
    pub runner: RunnerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3030
}

/// Task catalog location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_path")]
    pub path: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: default_registry_path(),
        }
    }
}

fn default_registry_path() -> PathBuf {
    launchdeck_home().join("tasks.json")
}

/// LaunchAgent discovery and control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchdConfig {
    /// Directory holding the per-user LaunchAgent plists.
    #[serde(default = "default_agents_dir")]
    pub agents_dir: PathBuf,

    /// Only labels starting with one of these prefixes are owned by launchdeck.
    #[serde(default = "default_label_prefixes")]
    pub label_prefixes: Vec<String>,

    /// Program used to talk to launchd.
    #[serde(default = "default_launchctl")]
    pub launchctl: String,

    /// Human readable names keyed by label.
    #[serde(default)]
    pub display_names: BTreeMap<String, String>,
}

impl Default for LaunchdConfig {
    fn default() -> Self {
        Self {
            agents_dir: default_agents_dir(),
            label_prefixes: default_label_prefixes(),
            launchctl: default_launchctl(),
            display_names: BTreeMap::new(),
        }
    }
}

fn default_agents_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join("Library").join("LaunchAgents"))
        .unwrap_or_else(|| PathBuf::from("/tmp/LaunchAgents"))
}

fn default_label_prefixes() -> Vec<String> {
    vec!["com.lman.".to_string(), "com.dayflow.".to_string()]
}

fn default_launchctl() -> String {
    "launchctl".to_string()
}

/// Manual task execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Interpreter the task script is handed to. Empty runs the script itself.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            working_dir: None,
        }
    }
}

fn default_interpreter() -> String {
    "node".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for launchdeck's own rolling log files.
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_level")]
    pub level: String,

    /// Directory of task output logs surfaced by the logs endpoint.
    #[serde(default = "default_task_logs_dir")]
    pub task_logs_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            level: default_level(),
            task_logs_dir: default_task_logs_dir(),
        }
    }
}

fn default_log_dir() -> PathBuf {
    launchdeck_home().join("debug")
}

fn default_level() -> String {
    "info".to_string()
}

fn default_task_logs_dir() -> PathBuf {
    launchdeck_home().join("logs")
}

/// Base directory for launchdeck state (`~/.launchdeck`).
pub fn launchdeck_home() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".launchdeck"))
        .unwrap_or_else(|| PathBuf::from(".launchdeck"))
}
