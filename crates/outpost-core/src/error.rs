use thiserror::Error;

use crate::scheduler::TaskId;

/// Configuration errors detected before any scheduled action runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("task registered twice: {0}")]
    DuplicateTask(TaskId),

    #[error("task '{task}' depends on unregistered task {dependency}")]
    UnknownDependency { task: String, dependency: TaskId },

    #[error("dependency cycle among tasks: {}", .0.join(", "))]
    Cycle(Vec<String>),
}
