//! Daemon-related errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or writing property lists.
#[derive(Debug, Error)]
pub enum PlistError {
    /// Underlying XML could not be tokenized.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Well-formed XML that is not a valid property list.
    #[error("Malformed plist: {0}")]
    Malformed(String),
}

/// Errors raised when a schedule cannot be translated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    /// No trigger supplied.
    #[error("At least one schedule entry is required")]
    Empty,

    /// Required field absent.
    #[error("Schedule entry {index}: {field} is required")]
    Missing { index: usize, field: &'static str },

    /// Field present but not an integer.
    #[error("Schedule entry {index}: {field} must be an integer, got {value:?}")]
    NotAnInteger {
        index: usize,
        field: &'static str,
        value: String,
    },

    /// Integer outside the calendar range.
    #[error("Schedule entry {index}: {field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        index: usize,
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// The on-disk StartCalendarInterval has an unexpected shape.
    #[error("Invalid StartCalendarInterval: {0}")]
    InvalidNative(String),
}

/// Errors that can occur during LaunchAgent operations.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// No descriptor file for this label.
    #[error("LaunchAgent not found: {0}")]
    NotFound(String),

    /// Label cannot be mapped to a file in the agents directory.
    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    /// Descriptor parsed but does not describe a job.
    #[error("Invalid descriptor at {path}: {reason}")]
    InvalidDescriptor { path: PathBuf, reason: String },

    /// Plist codec failure.
    #[error(transparent)]
    Plist(#[from] PlistError),

    /// Schedule translation failure.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// launchctl ran and rejected the request.
    #[error("launchctl {command} failed: {message}")]
    CommandFailed { command: String, message: String },

    /// launchctl could not be started.
    #[error("Failed to execute {program}: {reason}")]
    Spawn { program: String, reason: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DaemonError {
    /// Whether the daemon itself refused the command (as opposed to local I/O trouble).
    pub fn is_command_failure(&self) -> bool {
        matches!(self, DaemonError::CommandFailed { .. } | DaemonError::Spawn { .. })
    }
}
