use super::*;
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

fn write_catalog(dir: &TempDir, catalog: Value) -> TaskRegistry {
    let path = dir.path().join("tasks.json");
    std::fs::write(&path, serde_json::to_string_pretty(&catalog).unwrap()).unwrap();
    TaskRegistry::new(path)
}

fn sample() -> Value {
    json!({
        "tasks": [
            {"id": "daily-brief", "name": "Daily Brief", "enabled": false, "status": "idle",
             "scriptPath": "~/scripts/brief.js", "schedule": "Daily 09:00"},
            {"id": "weekly-review", "name": "Weekly Review", "enabled": true, "status": "error"}
        ],
        "categories": {"morning": {"name": "Morning", "color": "#f5a623"}}
    })
}

#[tokio::test]
async fn test_list_missing_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let registry = TaskRegistry::new(dir.path().join("absent.json"));
    let catalog = registry.list().await.unwrap();
    assert!(catalog.tasks.is_empty());
    assert!(catalog.categories.is_empty());
}

#[tokio::test]
async fn test_list_invalid_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasks.json");
    std::fs::write(&path, "{not json").unwrap();
    let registry = TaskRegistry::new(path);
    assert!(matches!(registry.list().await, Err(RegistryError::Json(_))));
}

#[tokio::test]
async fn test_get() {
    let dir = TempDir::new().unwrap();
    let registry = write_catalog(&dir, sample());

    let task = registry.get("weekly-review").await.unwrap();
    assert_eq!(task.name, "Weekly Review");
    assert_eq!(task.status, TaskStatus::Error);

    assert!(matches!(
        registry.get("nope").await,
        Err(RegistryError::NotFound(id)) if id == "nope"
    ));
}

#[tokio::test]
async fn test_toggle_twice_restores_flag() {
    let dir = TempDir::new().unwrap();
    let registry = write_catalog(&dir, sample());

    let task = registry.toggle("daily-brief").await.unwrap();
    assert!(task.enabled);
    assert!(registry.get("daily-brief").await.unwrap().enabled);

    let task = registry.toggle("daily-brief").await.unwrap();
    assert!(!task.enabled);
    assert!(!registry.get("daily-brief").await.unwrap().enabled);
}

#[tokio::test]
async fn test_update_merges_and_persists() {
    let dir = TempDir::new().unwrap();
    let registry = write_catalog(&dir, sample());

    let patch = json!({"id": "hijack", "schedule": "Daily 07:30", "notes": "earlier"});
    let task = registry
        .update("daily-brief", patch.as_object().unwrap())
        .await
        .unwrap();
    assert_eq!(task.id, "daily-brief");
    assert_eq!(task.schedule, "Daily 07:30");
    assert_eq!(task.name, "Daily Brief");

    let stored = registry.get("daily-brief").await.unwrap();
    assert_eq!(stored, task);
    assert_eq!(stored.extra["notes"], "earlier");
    assert!(registry.get("hijack").await.is_err());

    let catalog = registry.list().await.unwrap();
    assert_eq!(catalog.categories["morning"]["color"], "#f5a623");
    assert_eq!(catalog.tasks.len(), 2);
}

#[tokio::test]
async fn test_invalid_patch_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let registry = write_catalog(&dir, sample());
    let before = std::fs::read_to_string(registry.path()).unwrap();

    let patch = json!({"enabled": "sometimes"});
    let err = registry
        .update("daily-brief", patch.as_object().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidPatch(_)));
    assert_eq!(std::fs::read_to_string(registry.path()).unwrap(), before);
}

#[tokio::test]
async fn test_mark_running_and_status() {
    let dir = TempDir::new().unwrap();
    let registry = write_catalog(&dir, sample());
    let at = Utc::now();

    let task = registry.mark_running("daily-brief", at).await.unwrap();
    assert_eq!(task.status, TaskStatus::Running);
    assert_eq!(task.last_run, Some(at));

    let task = registry.set_status("daily-brief", TaskStatus::Idle).await.unwrap();
    assert_eq!(task.status, TaskStatus::Idle);
    assert_eq!(task.last_run, Some(at));
}

#[tokio::test]
async fn test_mutating_missing_catalog_is_not_found() {
    let dir = TempDir::new().unwrap();
    let registry = TaskRegistry::new(dir.path().join("nested").join("tasks.json"));
    assert!(matches!(registry.toggle("x").await, Err(RegistryError::NotFound(_))));
    assert!(!registry.path().exists());
}

#[tokio::test]
async fn test_concurrent_toggles_are_serialized() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(write_catalog(&dir, sample()));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            registry.toggle("daily-brief").await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Ten flips from false lands back on false.
    assert!(!registry.get("daily-brief").await.unwrap().enabled);
}

#[tokio::test]
async fn test_concurrent_updates_to_different_fields_both_land() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(write_catalog(&dir, sample()));

    let a = {
        let registry = registry.clone();
        tokio::spawn(async move {
            let patch = json!({"icon": "sun"});
            registry.update("daily-brief", patch.as_object().unwrap()).await.unwrap();
        })
    };
    let b = {
        let registry = registry.clone();
        tokio::spawn(async move {
            let patch = json!({"category": "morning"});
            registry.update("daily-brief", patch.as_object().unwrap()).await.unwrap();
        })
    };
    a.await.unwrap();
    b.await.unwrap();

    let task = registry.get("daily-brief").await.unwrap();
    assert_eq!(task.icon, "sun");
    assert_eq!(task.category, "morning");
}
