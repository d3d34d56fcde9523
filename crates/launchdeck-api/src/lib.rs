//! # launchdeck API
//!
//! The control surface over the task catalog and the user's LaunchAgents.
//!
//! - **HTTP**: `/api/tasks`, `/api/launchagents`, status, health and logs
//! - **WebSocket**: `/ws` pushes an event after every successful mutation
//! - **Lifecycle**: manual task runs with `idle -> running -> idle|error` tracking
//!
//! ## Architecture
//!
//! ```text
//!   HTTP routes ──► TaskRunner ──► TaskRegistry (tasks.json)
//!        │              │
//!        │              └────────► BroadcastHub ──► /ws subscribers
//!        ▼
//!   launchdeck-daemon: DescriptorStore, LaunchctlBridge, plist
//! ```

pub mod error;
pub mod http;
pub mod lifecycle;
pub mod registry;
pub mod server;
pub mod state;
pub mod websocket;

pub use error::{ApiError, RegistryError};
pub use http::routes::create_router;
pub use lifecycle::{RunOutcome, TaskRunner};
pub use registry::{TaskCatalog, TaskRecord, TaskRegistry, TaskStatus};
pub use server::{ApiConfig, ApiServer};
pub use state::AppState;
pub use websocket::{BroadcastHub, Event, WsMessage};
