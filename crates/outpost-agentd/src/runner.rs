//! Startup of the supervised process set.
//!
//! Every configured process becomes one scheduled task; `after` lists become
//! dependency edges. A daemon task spawns its supervision loop and completes at
//! once. A one-shot task completes only when its loop reached `Terminal`, so
//! dependents start after it finished.
use std::collections::HashMap;

use outpost_core::{ScheduledTask, Scheduler, SchedulerError, TaskId};
use outpost_exec::ProcSupervisor;
use tracing::info;

use crate::config::ProcessConfig;

pub fn build_tasks(processes: &[ProcessConfig]) -> Vec<ScheduledTask> {
    let tasks: Vec<ScheduledTask> = processes
        .iter()
        .map(|p| {
            let spec = p.to_spec();
            ScheduledTask::new(p.name.clone(), move || ProcSupervisor::new(spec).start())
        })
        .collect();

    let ids: HashMap<&str, TaskId> = processes
        .iter()
        .zip(&tasks)
        .map(|(p, t)| (p.name.as_str(), t.id().clone()))
        .collect();

    tasks
        .into_iter()
        .zip(processes)
        .map(|(task, p)| {
            let deps = p.after.iter().filter_map(|name| ids.get(name.as_str()).cloned());
            task.with_deps(deps)
        })
        .collect()
}

/// Starts every process in dependency order and returns once all tasks completed.
///
/// Daemons keep running on their own tasks afterwards.
pub async fn launch(processes: &[ProcessConfig]) -> Result<(), SchedulerError> {
    let mut scheduler = Scheduler::new();
    scheduler.register_tasks(build_tasks(processes))?;
    info!(processes = scheduler.len(), "starting supervised processes");
    scheduler.run().await
}

#[cfg(all(test, unix))]
mod tests {
    use std::{path::Path, time::Duration};

    use outpost_model::{ProcKind, RestartPolicy};

    use super::*;

    fn sh(name: &str, script: String, kind: ProcKind, after: &[&str]) -> ProcessConfig {
        ProcessConfig {
            name: name.to_string(),
            exec: "/bin/sh".into(),
            args: vec!["-c".to_string(), script],
            restart: RestartPolicy::Never,
            restart_delay_ms: Some(10),
            user: Default::default(),
            kind,
            after: after.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn marker(dir: &Path, name: &str) -> String {
        dir.join(name).display().to_string()
    }

    #[tokio::test]
    async fn one_shots_finish_before_dependents() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b, c) = (marker(dir.path(), "a"), marker(dir.path(), "b"), marker(dir.path(), "c"));

        let processes = vec![
            sh("c", format!("test -f {b} && touch {c}"), ProcKind::OneShot, &["b"]),
            sh("a", format!("sleep 0.2 && touch {a}"), ProcKind::OneShot, &[]),
            sh("b", format!("test -f {a} && touch {b}"), ProcKind::OneShot, &["a"]),
        ];
        launch(&processes).await.unwrap();

        assert!(Path::new(&c).exists());
    }

    #[tokio::test]
    async fn daemon_task_completes_without_waiting() {
        let dir = tempfile::tempdir().unwrap();
        let done = marker(dir.path(), "done");
        let processes = vec![
            sh("slow", "sleep 30".to_string(), ProcKind::Daemon, &[]),
            sh("next", format!("touch {done}"), ProcKind::OneShot, &["slow"]),
        ];

        tokio::time::timeout(Duration::from_secs(5), launch(&processes))
            .await
            .unwrap()
            .unwrap();
        assert!(Path::new(&done).exists());
    }

    #[tokio::test]
    async fn cycle_starts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let touched = marker(dir.path(), "touched");
        let processes = vec![
            sh("x", format!("touch {touched}"), ProcKind::OneShot, &["y"]),
            sh("y", format!("touch {touched}"), ProcKind::OneShot, &["x"]),
        ];

        let err = launch(&processes).await.unwrap_err();
        assert!(matches!(err, SchedulerError::Cycle(_)));
        assert!(!Path::new(&touched).exists());
    }

    #[test]
    fn edges_follow_after_lists() {
        let processes = vec![
            sh("setup", String::new(), ProcKind::OneShot, &[]),
            sh("game", String::new(), ProcKind::Daemon, &["setup"]),
        ];
        let tasks = build_tasks(&processes);
        assert!(tasks[0].deps().is_empty());
        assert_eq!(tasks[1].deps(), [tasks[0].id().clone()]);
    }
}
