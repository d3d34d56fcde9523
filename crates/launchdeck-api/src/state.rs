//! Application state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use launchdeck_config::Config;
use launchdeck_daemon::{CommandRunner, DescriptorStore, LaunchctlBridge, ProcessRunner};

use crate::lifecycle::TaskRunner;
use crate::registry::TaskRegistry;
use crate::websocket::BroadcastHub;

/// Services shared by every handler. Built once at startup.
pub struct AppState {
    pub config: Config,
    pub registry: Arc<TaskRegistry>,
    pub descriptors: Arc<DescriptorStore>,
    pub bridge: Arc<LaunchctlBridge>,
    pub runner: TaskRunner,
    pub hub: Arc<BroadcastHub>,
    start_time: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_command_runner(config, Arc::new(ProcessRunner))
    }

    /// State whose launchctl invocations go through `commands`.
    pub fn with_command_runner(config: Config, commands: Arc<dyn CommandRunner>) -> Self {
        let registry = Arc::new(TaskRegistry::new(config.registry.path.clone()));
        let hub = Arc::new(BroadcastHub::new());
        let descriptors = Arc::new(DescriptorStore::new(
            config.launchd.agents_dir.clone(),
            config.launchd.label_prefixes.clone(),
        ));
        let bridge = Arc::new(LaunchctlBridge::with_runner(
            config.launchd.launchctl.clone(),
            config.launchd.agents_dir.clone(),
            commands,
        ));
        let runner = TaskRunner::new(registry.clone(), hub.clone(), &config.runner);

        Self {
            config,
            registry,
            descriptors,
            bridge,
            runner,
            hub,
            start_time: Instant::now(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Human readable name for a label: configured name, else derived from
    /// the label with its owned prefix removed.
    pub fn display_name(&self, label: &str) -> String {
        if let Some(name) = self.config.launchd.display_names.get(label) {
            return name.clone();
        }

        let short = self
            .config
            .launchd
            .label_prefixes
            .iter()
            .find_map(|p| label.strip_prefix(p.as_str()))
            .unwrap_or(label);

        // Dashes become spaces; every word starts upper case.
        let mut name = String::with_capacity(short.len());
        let mut at_boundary = true;
        for c in short.chars() {
            let c = if c == '-' { ' ' } else { c };
            let is_word = c.is_alphanumeric() || c == '_';
            if is_word && at_boundary {
                name.extend(c.to_uppercase());
            } else {
                name.push(c);
            }
            at_boundary = !is_word;
        }
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_derived() {
        let state = AppState::new(Config::default());
        assert_eq!(state.display_name("com.lman.daily-brief"), "Daily Brief");
        assert_eq!(state.display_name("com.dayflow.sync"), "Sync");
        assert_eq!(state.display_name("com.lman.rss-2-mail"), "Rss 2 Mail");
        assert_eq!(state.display_name("org.other.job"), "Org.Other.Job");
    }

    #[test]
    fn test_display_name_configured() {
        let mut config = Config::default();
        config
            .launchd
            .display_names
            .insert("com.lman.twitter-bot".to_string(), "X Poster".to_string());
        let state = AppState::new(config);
        assert_eq!(state.display_name("com.lman.twitter-bot"), "X Poster");
    }

    #[test]
    fn test_uptime() {
        let state = AppState::new(Config::default());
        std::thread::sleep(Duration::from_millis(10));
        assert!(state.uptime().as_millis() >= 10);
    }
}
