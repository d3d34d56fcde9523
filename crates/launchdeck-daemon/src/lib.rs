//! # launchdeck daemon
//!
//! Everything that touches launchd lives here:
//!
//! - [`plist`]: XML property list reader and writer
//! - [`schedule`]: `StartCalendarInterval` <-> display schedule translation
//! - [`launchd`]: the per-label descriptor store and the `launchctl` bridge
//!
//! ## Usage
//!
//! ```rust,ignore
//! use launchdeck_daemon::launchd::{DescriptorStore, LaunchctlBridge};
//!
//! let store = DescriptorStore::new(agents_dir.clone(), vec!["com.example.".into()]);
//! let bridge = LaunchctlBridge::new("launchctl", agents_dir);
//!
//! let descriptor = store.read("com.example.brief").await?;
//! let status = bridge.query_status(&descriptor.label).await?;
//! ```

pub mod error;
pub mod launchd;
pub mod plist;
pub mod schedule;
pub mod testing;

pub use error::{DaemonError, PlistError, ScheduleError};
pub use launchd::{
    AgentStatus, CommandOutput, CommandRunner, DescriptorStore, JobDescriptor, LaunchctlBridge,
    ProcessRunner,
};
pub use plist::{PlistDict, PlistValue};
pub use schedule::{CalendarInterval, CalendarTrigger, DisplaySchedule, FieldValue, HourSpec, ScheduleEntry};
