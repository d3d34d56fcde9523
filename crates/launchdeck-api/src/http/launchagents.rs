//! LaunchAgent route handlers.
//!
//! - GET  /api/launchagents                 - List owned agents with live status
//! - GET  /api/launchagents/{label}         - One agent
//! - PUT  /api/launchagents/{label}/schedule - Replace the calendar schedule and reload
//! - POST /api/launchagents/{label}/toggle  - Load or unload persistently
//! - POST /api/launchagents/{label}/reload  - Unload then load
//! - POST /api/launchagents/{label}/trigger - Start now
//!
//! launchctl rejections come back as `{success:false, error}` with status 200.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use launchdeck_daemon::{schedule, AgentStatus, DisplaySchedule, JobDescriptor, ScheduleEntry};

use crate::error::ApiError;
use crate::state::AppState;
use crate::websocket::Event;

/// A descriptor merged with launchd's live view of it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentView {
    pub label: String,
    pub name: String,
    pub plist_path: String,
    pub schedules: Vec<DisplaySchedule>,
    pub status: AgentStatus,
    pub script_path: Option<String>,
    pub enabled: bool,
    pub environment_vars: BTreeMap<String, String>,
    pub run_at_load: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard_out_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard_error_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AgentListResponse {
    pub success: bool,
    pub agents: Vec<AgentView>,
}

#[derive(Debug, Serialize)]
pub struct AgentResponse {
    pub success: bool,
    pub agent: AgentView,
}

/// Outcome of a mutation that launchctl accepted.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

impl ActionResponse {
    fn ok(message: String) -> Json<Self> {
        Json(Self {
            success: true,
            message,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateScheduleRequest {
    pub schedules: Vec<ScheduleEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleAgentRequest {
    pub enabled: bool,
}

fn agent_view(state: &AppState, descriptor: JobDescriptor, status: AgentStatus) -> AgentView {
    let path_string = |p: &std::path::PathBuf| p.to_string_lossy().into_owned();
    AgentView {
        name: state.display_name(&descriptor.label),
        plist_path: path_string(&state.descriptors.plist_path(&descriptor.label)),
        schedules: descriptor.schedules(),
        status,
        script_path: descriptor.script_path().map(str::to_string),
        enabled: descriptor.enabled,
        run_at_load: descriptor.run_at_load,
        standard_out_path: descriptor.stdout_path.as_ref().map(path_string),
        standard_error_path: descriptor.stderr_path.as_ref().map(path_string),
        environment_vars: descriptor.environment,
        label: descriptor.label,
    }
}

/// Live statuses, or none at all when launchctl cannot be queried.
async fn live_statuses(state: &AppState) -> HashMap<String, AgentStatus> {
    match state.bridge.list_statuses().await {
        Ok(statuses) => statuses,
        Err(e) => {
            warn!("Failed to query launchd status: {}", e);
            HashMap::new()
        }
    }
}

/// The label is owned, names a file inside the agents directory, and that file exists.
async fn ensure_agent(state: &AppState, label: &str) -> Result<(), ApiError> {
    if !state.descriptors.owns(label) || !state.descriptors.exists(label).await? {
        return Err(ApiError::NotFound("Agent not found".to_string()));
    }
    Ok(())
}

/// List owned agents.
///
/// GET /api/launchagents
pub async fn list_agents(State(state): State<Arc<AppState>>) -> Result<Json<AgentListResponse>, ApiError> {
    let labels = state.descriptors.list_labels().await?;
    let statuses = live_statuses(&state).await;

    let mut agents = Vec::with_capacity(labels.len());
    for label in labels {
        match state.descriptors.read(&label).await {
            Ok(descriptor) => {
                let status = statuses.get(&label).copied().unwrap_or_else(AgentStatus::not_loaded);
                agents.push(agent_view(&state, descriptor, status));
            }
            Err(e) => warn!("Skipping LaunchAgent {}: {}", label, e),
        }
    }

    Ok(Json(AgentListResponse {
        success: true,
        agents,
    }))
}

/// Get one agent.
///
/// GET /api/launchagents/{label}
pub async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(label): Path<String>,
) -> Result<Json<AgentResponse>, ApiError> {
    ensure_agent(&state, &label).await?;
    let descriptor = state.descriptors.read(&label).await?;
    let status = live_statuses(&state)
        .await
        .get(&label)
        .copied()
        .unwrap_or_else(AgentStatus::not_loaded);

    Ok(Json(AgentResponse {
        success: true,
        agent: agent_view(&state, descriptor, status),
    }))
}

/// Replace the schedule, then reload so launchd picks it up.
///
/// PUT /api/launchagents/{label}/schedule
pub async fn update_schedule(
    State(state): State<Arc<AppState>>,
    Path(label): Path<String>,
    Json(request): Json<UpdateScheduleRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    ensure_agent(&state, &label).await?;
    let interval = schedule::encode(&request.schedules).map_err(|e| ApiError::Validation(e.to_string()))?;

    // Held across write and reload so edits to one label apply in order.
    let _guard = state.descriptors.lock(&label).await;
    let mut descriptor = state.descriptors.read(&label).await?;
    descriptor.schedule = Some(interval);
    state.descriptors.write(&label, &descriptor).await?;
    info!("Updated schedule for {} ({} trigger(s))", label, request.schedules.len());

    // The file changed whether or not launchd accepts the reload.
    state.hub.broadcast(&Event::LaunchAgentUpdated { label: label.clone() });

    if let Err(e) = state.bridge.reload(&label).await {
        return Err(match ApiError::from(e) {
            ApiError::Daemon(message) => {
                ApiError::Daemon(format!("Schedule saved but reload failed: {}", message))
            }
            other => other,
        });
    }

    Ok(ActionResponse::ok(format!("Updated schedule for {}", label)))
}

/// Load or unload persistently.
///
/// POST /api/launchagents/{label}/toggle
pub async fn toggle_agent(
    State(state): State<Arc<AppState>>,
    Path(label): Path<String>,
    Json(request): Json<ToggleAgentRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    ensure_agent(&state, &label).await?;
    state.bridge.set_enabled(&label, request.enabled).await?;

    state.hub.broadcast(&Event::LaunchAgentToggled {
        label: label.clone(),
        enabled: request.enabled,
    });
    let verb = if request.enabled { "Enabled" } else { "Disabled" };
    Ok(ActionResponse::ok(format!("{} {}", verb, label)))
}

/// POST /api/launchagents/{label}/reload
pub async fn reload_agent(
    State(state): State<Arc<AppState>>,
    Path(label): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    ensure_agent(&state, &label).await?;
    {
        let _guard = state.descriptors.lock(&label).await;
        state.bridge.reload(&label).await?;
    }

    state.hub.broadcast(&Event::LaunchAgentReloaded { label: label.clone() });
    Ok(ActionResponse::ok(format!("Reloaded {}", label)))
}

/// Start the job now, outside its schedule.
///
/// POST /api/launchagents/{label}/trigger
pub async fn trigger_agent(
    State(state): State<Arc<AppState>>,
    Path(label): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    ensure_agent(&state, &label).await?;
    state.bridge.trigger(&label).await?;

    state.hub.broadcast(&Event::LaunchAgentTriggered { label: label.clone() });
    Ok(ActionResponse::ok(format!("Triggered {}", label)))
}
