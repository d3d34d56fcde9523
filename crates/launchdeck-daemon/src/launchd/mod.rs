//! macOS LaunchAgent management.
//!
//! [`DescriptorStore`] owns the plist files, [`LaunchctlBridge`] owns every
//! `launchctl` invocation. Nothing else in launchdeck touches either.

mod launchd_descriptor;
mod launchd_ops;
mod launchd_runner;

pub use launchd_descriptor::{validate_label, DescriptorStore, JobDescriptor};
pub use launchd_ops::{parse_launchctl_list, AgentStatus, LaunchctlBridge};
pub use launchd_runner::{CommandOutput, CommandRunner, ProcessRunner};

#[cfg(test)]
#[path = "launchd_tests.rs"]
mod tests;
