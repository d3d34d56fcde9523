//! HTTP interface module.
//!
//! Provides REST API endpoints for:
//! - The task catalog and manual runs
//! - LaunchAgent schedules and launchd control
//! - Health, status and task logs

pub mod launchagents;
pub mod monitoring;
pub mod routes;
pub mod tasks;
