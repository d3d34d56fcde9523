//! JSON-file task registry.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::record::{TaskCatalog, TaskRecord, TaskStatus};
use crate::error::RegistryError;

/// The task catalog, persisted as one JSON document.
///
/// Every mutation holds the writer lock for its whole load, mutate and save
/// cycle, so concurrent updates to the same record cannot lose each other.
pub struct TaskRegistry {
    path: PathBuf,
    writer: Mutex<()>,
}

impl TaskRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full catalog. A missing file is an empty catalog.
    pub async fn list(&self) -> Result<TaskCatalog, RegistryError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Task catalog {:?} does not exist yet", self.path);
                return Ok(TaskCatalog::default());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    pub async fn get(&self, id: &str) -> Result<TaskRecord, RegistryError> {
        self.list()
            .await?
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Shallow-merge `patch` into the record. `id` in the patch is ignored.
    pub async fn update(&self, id: &str, patch: &Map<String, Value>) -> Result<TaskRecord, RegistryError> {
        let task = self
            .mutate(id, |task| {
                *task = task
                    .merged(patch)
                    .map_err(|e| RegistryError::InvalidPatch(e.to_string()))?;
                Ok(())
            })
            .await?;
        info!("Updated task: {}", id);
        Ok(task)
    }

    /// Flip `enabled`.
    pub async fn toggle(&self, id: &str) -> Result<TaskRecord, RegistryError> {
        let task = self
            .mutate(id, |task| {
                task.enabled = !task.enabled;
                Ok(())
            })
            .await?;
        info!("Toggled task {}: enabled={}", id, task.enabled);
        Ok(task)
    }

    /// Record the start of a run.
    pub async fn mark_running(&self, id: &str, at: DateTime<Utc>) -> Result<TaskRecord, RegistryError> {
        self.mutate(id, |task| {
            task.status = TaskStatus::Running;
            task.last_run = Some(at);
            Ok(())
        })
        .await
    }

    pub async fn set_status(&self, id: &str, status: TaskStatus) -> Result<TaskRecord, RegistryError> {
        self.mutate(id, |task| {
            task.status = status;
            Ok(())
        })
        .await
    }

    /// Read-modify-write of one record under the writer lock.
    ///
    /// Nothing is written when `f` fails.
    pub async fn mutate<F>(&self, id: &str, f: F) -> Result<TaskRecord, RegistryError>
    where
        F: FnOnce(&mut TaskRecord) -> Result<(), RegistryError>,
    {
        let _guard = self.writer.lock().await;
        let mut catalog = self.list().await?;
        let task = catalog
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        f(task)?;
        let task = task.clone();
        self.save(&catalog).await?;
        Ok(task)
    }

    /// Persist the whole catalog through a temp file and rename.
    async fn save(&self, catalog: &TaskCatalog) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_string_pretty(catalog)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!("Saved task catalog to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
