//! Task catalog document types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Last known execution outcome of a task.
///
/// Advisory only: this is what the last manual run reported, not launchd's
/// live view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Idle,
    Running,
    Error,
}

/// One entry of the task catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub script_path: String,
    /// Display string, e.g. "Daily 09:00".
    #[serde(default)]
    pub schedule: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    /// Fields the catalog carries that are not modeled here.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            category: String::new(),
            icon: String::new(),
            description: String::new(),
            script_path: String::new(),
            schedule: String::new(),
            enabled: false,
            status: TaskStatus::Idle,
            last_run: None,
            extra: Map::new(),
        }
    }

    /// Shallow merge: every top-level field in `patch` replaces the record's
    /// value. `id` is never changed.
    pub fn merged(&self, patch: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(fields) = &mut value {
            for (key, field) in patch {
                if key != "id" {
                    fields.insert(key.clone(), field.clone());
                }
            }
        }
        serde_json::from_value(value)
    }
}

/// The whole catalog document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskCatalog {
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
    #[serde(default)]
    pub categories: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskCatalog {
    pub fn get(&self, id: &str) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut TaskRecord> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_round_trip_keeps_unknown_fields() {
        let raw = json!({
            "id": "daily-brief",
            "name": "Daily Brief",
            "category": "morning",
            "icon": "sun",
            "scriptPath": "~/scripts/brief.js",
            "schedule": "Daily 09:00",
            "enabled": false,
            "status": "idle",
            "launchAgent": "com.lman.daily-brief"
        });
        let record: TaskRecord = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(record.script_path, "~/scripts/brief.js");
        assert_eq!(record.status, TaskStatus::Idle);
        assert_eq!(record.extra["launchAgent"], "com.lman.daily-brief");

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["launchAgent"], "com.lman.daily-brief");
        assert!(back.get("lastRun").is_none());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&TaskStatus::Running).unwrap(), "\"running\"");
        let status: TaskStatus = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(status, TaskStatus::Error);
    }

    #[test]
    fn test_merged_is_shallow_and_keeps_id() {
        let mut record = TaskRecord::new("daily-brief");
        record.name = "Daily Brief".to_string();
        record.extra.insert("meta".into(), json!({"a": 1, "b": 2}));

        let patch = json!({"id": "other", "name": "Morning Brief", "meta": {"a": 3}, "owner": "lman"});
        let merged = record.merged(patch.as_object().unwrap()).unwrap();

        assert_eq!(merged.id, "daily-brief");
        assert_eq!(merged.name, "Morning Brief");
        assert_eq!(merged.extra["meta"], json!({"a": 3}));
        assert_eq!(merged.extra["owner"], "lman");
    }

    #[test]
    fn test_merged_rejects_wrong_types() {
        let record = TaskRecord::new("daily-brief");
        let patch = json!({"enabled": "yes"});
        assert!(record.merged(patch.as_object().unwrap()).is_err());
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog: TaskCatalog = serde_json::from_value(json!({
            "tasks": [{"id": "a"}, {"id": "b", "enabled": true}],
            "categories": {"morning": {"name": "Morning"}},
            "version": 2
        }))
        .unwrap();
        assert!(catalog.get("b").unwrap().enabled);
        assert!(catalog.get("c").is_none());
        assert_eq!(catalog.extra["version"], 2);
    }
}
