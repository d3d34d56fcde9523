use super::*;

use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;

use crate::websocket::Subscription;

struct Fixture {
    _dir: TempDir,
    dir_path: PathBuf,
    registry: Arc<TaskRegistry>,
    hub: Arc<BroadcastHub>,
    runner: TaskRunner,
}

fn fixture(scripts: &[(&str, &str)]) -> Fixture {
    let dir = TempDir::new().unwrap();
    let dir_path = dir.path().to_path_buf();

    let mut tasks = Vec::new();
    for (id, body) in scripts {
        let script = dir_path.join(format!("{}.sh", id));
        std::fs::write(&script, body).unwrap();
        tasks.push(json!({
            "id": id,
            "name": id,
            "enabled": true,
            "status": "idle",
            "scriptPath": script.to_string_lossy(),
        }));
    }
    tasks.push(json!({"id": "no-script", "status": "idle"}));

    let registry_path = dir_path.join("tasks.json");
    std::fs::write(
        &registry_path,
        serde_json::to_string_pretty(&json!({"tasks": tasks, "categories": {}})).unwrap(),
    )
    .unwrap();

    let registry = Arc::new(TaskRegistry::new(registry_path));
    let hub = Arc::new(BroadcastHub::new());
    let config = RunnerConfig {
        interpreter: "sh".to_string(),
        working_dir: None,
    };
    let runner = TaskRunner::new(registry.clone(), hub.clone(), &config);

    Fixture {
        _dir: dir,
        dir_path,
        registry,
        hub,
        runner,
    }
}

fn drain(sub: &mut Subscription) -> Vec<Value> {
    let mut events = Vec::new();
    while let Ok(frame) = sub.receiver.try_recv() {
        events.push(serde_json::from_str(frame.as_str()).unwrap());
    }
    events
}

#[cfg(unix)]
#[tokio::test]
async fn test_successful_run_goes_running_then_idle() {
    let fx = fixture(&[("ok", "echo hello\necho warn >&2\n")]);
    let mut sub = fx.hub.subscribe();
    let requested = Utc::now();

    let outcome = fx.runner.run("ok").await.unwrap();
    assert_eq!(outcome.output, "hello\n");
    assert_eq!(outcome.stderr, "warn\n");
    assert_eq!(outcome.task.status, TaskStatus::Idle);

    let last_run = outcome.task.last_run.unwrap();
    assert!(last_run >= requested);
    assert!(last_run <= Utc::now());

    let events = drain(&mut sub);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["type"], "task-started");
    assert_eq!(events[0]["task"]["status"], "running");
    assert_eq!(events[1]["type"], "task-completed");
    assert_eq!(events[1]["task"]["status"], "idle");
    assert_eq!(events[1]["output"], "hello\n");

    assert_eq!(fx.registry.get("ok").await.unwrap().status, TaskStatus::Idle);
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_run_goes_to_error_and_can_retry() {
    let fx = fixture(&[("flaky", "echo partial\necho broken >&2\nexit 3\n")]);
    let mut sub = fx.hub.subscribe();

    let err = fx.runner.run("flaky").await.unwrap_err();
    match err {
        ApiError::Execution { message, output, stderr } => {
            assert!(message.contains("exit code 3"));
            assert!(message.contains("broken"));
            assert_eq!(output, "partial\n");
            assert_eq!(stderr, "broken\n");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fx.registry.get("flaky").await.unwrap().status, TaskStatus::Error);

    let events = drain(&mut sub);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["type"], "task-started");
    assert_eq!(events[1]["type"], "task-error");
    assert_eq!(events[1]["task"]["status"], "error");

    // Fix the script; error is not terminal.
    std::fs::write(fx.dir_path.join("flaky.sh"), "exit 0\n").unwrap();
    let outcome = fx.runner.run("flaky").await.unwrap();
    assert_eq!(outcome.task.status, TaskStatus::Idle);

    let events = drain(&mut sub);
    assert_eq!(events[0]["type"], "task-started");
    assert_eq!(events[1]["type"], "task-completed");
}

#[tokio::test]
async fn test_missing_script_path_is_an_execution_failure() {
    let fx = fixture(&[]);
    let err = fx.runner.run("no-script").await.unwrap_err();
    assert!(matches!(err, ApiError::Execution { ref message, .. } if message.contains("scriptPath")));

    let task = fx.registry.get("no-script").await.unwrap();
    assert_eq!(task.status, TaskStatus::Error);
    assert!(task.last_run.is_some());
}

#[tokio::test]
async fn test_spawn_failure_is_an_execution_failure() {
    let fx = fixture(&[("ok", "exit 0\n")]);
    let runner = TaskRunner::new(
        fx.registry.clone(),
        fx.hub.clone(),
        &RunnerConfig {
            interpreter: "/nonexistent/interpreter".to_string(),
            working_dir: None,
        },
    );

    let err = runner.run("ok").await.unwrap_err();
    assert!(matches!(err, ApiError::Execution { ref message, .. } if message.starts_with("Failed to start")));
    assert_eq!(fx.registry.get("ok").await.unwrap().status, TaskStatus::Error);
}

#[tokio::test]
async fn test_unknown_task_is_not_found_and_broadcasts_nothing() {
    let fx = fixture(&[]);
    let mut sub = fx.hub.subscribe();

    let err = fx.runner.run("ghost").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    assert!(drain(&mut sub).is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_abandoned_run_still_completes() {
    let fx = fixture(&[("slow", "")]);
    let marker = fx.dir_path.join("done.marker");
    std::fs::write(
        fx.dir_path.join("slow.sh"),
        format!("sleep 1\necho done > '{}'\n", marker.display()),
    )
    .unwrap();
    let mut sub = fx.hub.subscribe();

    let caller = tokio::time::timeout(Duration::from_millis(200), fx.runner.run("slow")).await;
    assert!(caller.is_err(), "caller should give up before the script exits");
    assert_eq!(fx.registry.get("slow").await.unwrap().status, TaskStatus::Running);

    let mut status = TaskStatus::Running;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        status = fx.registry.get("slow").await.unwrap().status;
        if status != TaskStatus::Running {
            break;
        }
    }
    assert_eq!(status, TaskStatus::Idle);
    assert!(marker.exists());

    let events = drain(&mut sub);
    let kinds: Vec<&str> = events.iter().map(|e| e["type"].as_str().unwrap()).collect();
    assert_eq!(kinds, vec!["task-started", "task-completed"]);
}
