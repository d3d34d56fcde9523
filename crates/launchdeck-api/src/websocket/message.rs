//! WebSocket message types.

use serde::{Deserialize, Serialize};

use crate::registry::TaskRecord;

/// State change pushed to every subscriber.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    TaskUpdated { task: TaskRecord },
    TaskToggled { task: TaskRecord },
    TaskStarted { task: TaskRecord },
    TaskCompleted { task: TaskRecord, output: String },
    TaskError { task: TaskRecord, error: String },
    #[serde(rename = "launchagent-updated")]
    LaunchAgentUpdated { label: String },
    #[serde(rename = "launchagent-toggled")]
    LaunchAgentToggled { label: String, enabled: bool },
    #[serde(rename = "launchagent-reloaded")]
    LaunchAgentReloaded { label: String },
    #[serde(rename = "launchagent-triggered")]
    LaunchAgentTriggered { label: String },
}

/// Connection-level messages exchanged with a single client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WsMessage {
    /// Heartbeat from the client.
    Ping {
        #[serde(default)]
        timestamp: i64,
    },

    /// Heartbeat answer.
    Pong { timestamp: i64 },

    /// Sent once when the connection opens.
    #[serde(rename_all = "camelCase")]
    Connected { connection_id: String },
}
