//! Task catalog route handlers.
//!
//! - GET  /api/tasks           - Full catalog
//! - GET  /api/tasks/{id}      - One task
//! - PUT  /api/tasks/{id}      - Shallow-merge fields into a task
//! - POST /api/tasks/{id}/toggle - Flip `enabled`
//! - POST /api/tasks/{id}/run  - Run the task's script and wait for it

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::registry::{TaskCatalog, TaskRecord};
use crate::state::AppState;
use crate::websocket::Event;

#[derive(Debug, Serialize)]
pub struct ToggleTaskResponse {
    pub success: bool,
    pub task: TaskRecord,
}

#[derive(Debug, Serialize)]
pub struct RunTaskResponse {
    pub success: bool,
    pub output: String,
    /// Standard error of a successful run.
    pub error: String,
}

/// GET /api/tasks
pub async fn list_tasks(State(state): State<Arc<AppState>>) -> Result<Json<TaskCatalog>, ApiError> {
    Ok(Json(state.registry.list().await?))
}

/// GET /api/tasks/{id}
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskRecord>, ApiError> {
    Ok(Json(state.registry.get(&id).await?))
}

/// PUT /api/tasks/{id}
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<Map<String, Value>>,
) -> Result<Json<TaskRecord>, ApiError> {
    let task = state.registry.update(&id, &patch).await?;
    state.hub.broadcast(&Event::TaskUpdated { task: task.clone() });
    Ok(Json(task))
}

/// POST /api/tasks/{id}/toggle
pub async fn toggle_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ToggleTaskResponse>, ApiError> {
    let task = state.registry.toggle(&id).await?;
    state.hub.broadcast(&Event::TaskToggled { task: task.clone() });
    Ok(Json(ToggleTaskResponse { success: true, task }))
}

/// POST /api/tasks/{id}/run
pub async fn run_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RunTaskResponse>, ApiError> {
    let outcome = state.runner.run(&id).await?;
    Ok(Json(RunTaskResponse {
        success: true,
        output: outcome.output,
        error: outcome.stderr,
    }))
}
