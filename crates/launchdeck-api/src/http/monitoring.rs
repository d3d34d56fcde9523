//! Status, health and task log handlers.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::warn;

use crate::error::ApiError;
use crate::registry::TaskStatus;
use crate::state::AppState;

const DEFAULT_LOG_LIMIT: usize = 20;
const LOG_PREVIEW_LINES: usize = 10;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// Task counts by state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub total: usize,
    pub enabled: usize,
    pub running: usize,
    pub idle: usize,
    pub error: usize,
}

/// Aggregate status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub timestamp: DateTime<Utc>,
    pub tasks: TaskCounts,
    /// Seconds since the server started.
    pub uptime: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
}

/// Head of one task log file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub file: String,
    /// First `YYYY-MM-DD` found in the file name.
    pub timestamp: Option<String>,
    pub content: String,
}

/// GET /api/health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}

/// GET /api/status
pub async fn system_status(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, ApiError> {
    let catalog = state.registry.list().await?;

    let mut counts = TaskCounts {
        total: catalog.tasks.len(),
        ..Default::default()
    };
    for task in &catalog.tasks {
        if task.enabled {
            counts.enabled += 1;
        }
        match task.status {
            TaskStatus::Running => counts.running += 1,
            TaskStatus::Idle => counts.idle += 1,
            TaskStatus::Error => counts.error += 1,
        }
    }

    Ok(Json(StatusResponse {
        timestamp: Utc::now(),
        tasks: counts,
        uptime: state.uptime().as_secs_f64(),
    }))
}

/// GET /api/logs?limit=N
pub async fn recent_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogsQuery>,
) -> Json<Vec<LogEntry>> {
    let limit = match query.limit {
        Some(n) if n > 0 => n,
        _ => DEFAULT_LOG_LIMIT,
    };
    Json(read_logs(&state.config.logging.task_logs_dir, limit).await)
}

/// Read the first lines of up to `limit` log files, sorted by name.
/// Unreadable entries are skipped; a missing directory yields nothing.
pub async fn read_logs(dir: &Path, limit: usize) -> Vec<LogEntry> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut files = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                if entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                    files.push(entry.file_name().to_string_lossy().into_owned());
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to list task logs in {:?}: {}", dir, e);
                break;
            }
        }
    }
    files.sort();

    let mut logs = Vec::new();
    for file in files.into_iter().take(limit) {
        let content = match fs::read(dir.join(&file)).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!("Failed to read task log {}: {}", file, e);
                continue;
            }
        };
        logs.push(LogEntry {
            timestamp: date_in_name(&file),
            content: content.lines().take(LOG_PREVIEW_LINES).collect::<Vec<_>>().join("\n"),
            file,
        });
    }
    logs
}

fn date_in_name(name: &str) -> Option<String> {
    static DATE: OnceLock<Option<Regex>> = OnceLock::new();
    DATE.get_or_init(|| Regex::new(r"\d{4}-\d{2}-\d{2}").ok())
        .as_ref()?
        .find(name)
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
#[path = "monitoring_tests.rs"]
mod tests;
