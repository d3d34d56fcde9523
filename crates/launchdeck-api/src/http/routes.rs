//! HTTP route definitions.

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::http::{launchagents, monitoring, tasks};
use crate::state::AppState;
use crate::websocket::ws_handler;

/// Create the main router.
///
/// ## Route Structure
///
/// ```text
/// /api/tasks
///   GET    /api/tasks               - Full task catalog
///   GET    /api/tasks/{id}          - One task
///   PUT    /api/tasks/{id}          - Merge fields into a task
///   POST   /api/tasks/{id}/toggle   - Flip enabled
///   POST   /api/tasks/{id}/run      - Run now and wait
///
/// /api/launchagents
///   GET    /api/launchagents                   - Owned agents with live status
///   GET    /api/launchagents/{label}           - One agent
///   PUT    /api/launchagents/{label}/schedule  - Replace schedule and reload
///   POST   /api/launchagents/{label}/toggle    - Load/unload persistently
///   POST   /api/launchagents/{label}/reload    - Unload then load
///   POST   /api/launchagents/{label}/trigger   - Start now
///
/// /api/status  - Task counts and uptime
/// /api/health  - Liveness
/// /api/logs    - Heads of recent task logs
///
/// /ws          - Push channel
/// ```
pub fn create_router(state: Arc<AppState>) -> Router {
    let task_routes = Router::new()
        .route("/", get(tasks::list_tasks))
        .route("/{id}", get(tasks::get_task).put(tasks::update_task))
        .route("/{id}/toggle", post(tasks::toggle_task))
        .route("/{id}/run", post(tasks::run_task));

    let agent_routes = Router::new()
        .route("/", get(launchagents::list_agents))
        .route("/{label}", get(launchagents::get_agent))
        .route("/{label}/schedule", put(launchagents::update_schedule))
        .route("/{label}/toggle", post(launchagents::toggle_agent))
        .route("/{label}/reload", post(launchagents::reload_agent))
        .route("/{label}/trigger", post(launchagents::trigger_agent));

    let api_routes = Router::new()
        .nest("/tasks", task_routes)
        .nest("/launchagents", agent_routes)
        .route("/status", get(monitoring::system_status))
        .route("/health", get(monitoring::health_check))
        .route("/logs", get(monitoring::recent_logs));

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
