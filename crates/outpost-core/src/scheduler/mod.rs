//! Dependency-ordered execution of one-shot tasks.
//!
//! ## Flow
//! ```text
//! register_tasks() ──► run()
//!                       ├─► build graph (unknown deps / cycles fail here, nothing runs)
//!                       ├─► spawn every root
//!                       └─► loop until all completed:
//!                             recv completion ──► release dependents whose in-degree hit 0
//! ```
//!
//! ## Rules
//! - Every action runs **exactly once**.
//! - A task starts only after **all** its dependencies completed.
//! - Start order among ready tasks is unspecified.
//! - Only the `run()` loop touches the graph; workers just report their index.
//!
//! ## Fault isolation
//! There is none. An action that panics never reports completion, so its
//! dependents never start and `run()` never returns.
mod graph;
mod task;

use std::collections::HashSet;

use tokio::sync::mpsc;
use tracing::info;

pub use task::{ScheduledTask, TaskId};

use crate::error::SchedulerError;
use graph::DependencyGraph;
use task::BoxAction;

#[derive(Debug, Default)]
pub struct Scheduler {
    tasks: Vec<ScheduledTask>,
    ids: HashSet<TaskId>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds tasks to the next run.
    ///
    /// Dependencies may point at tasks registered later; they are resolved by [`Scheduler::run`].
    pub fn register_tasks<I>(&mut self, tasks: I) -> Result<(), SchedulerError>
    where
        I: IntoIterator<Item = ScheduledTask>,
    {
        for task in tasks {
            if !self.ids.insert(task.id.clone()) {
                return Err(SchedulerError::DuplicateTask(task.id));
            }
            self.tasks.push(task);
        }
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Checks that every dependency is registered and that the graph is acyclic.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        self.graph().map(|_| ())
    }

    fn graph(&self) -> Result<DependencyGraph, SchedulerError> {
        DependencyGraph::build(
            self.tasks
                .iter()
                .map(|t| (&t.id, t.description.as_str(), t.deps.as_slice())),
        )
    }

    /// Runs every registered action once, in dependency order.
    ///
    /// Returns after the last action completed, or immediately with an error
    /// if the graph is invalid.
    pub async fn run(self) -> Result<(), SchedulerError> {
        let mut graph = self.graph()?;
        let total = graph.len();

        let mut names = Vec::with_capacity(total);
        let mut actions: Vec<Option<BoxAction>> = Vec::with_capacity(total);
        for task in self.tasks {
            names.push(task.description);
            actions.push(Some(task.action));
        }

        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<usize>();

        let roots: Vec<usize> = graph.roots().collect();
        for node in roots {
            launch(node, &mut actions, &names, &done_tx);
        }

        let mut completed = 0;
        while completed < total {
            // `done_tx` is held here, so the channel never closes.
            let Some(node) = done_rx.recv().await else {
                break;
            };
            completed += 1;
            info!(task = %names[node], completed, total, "task completed");

            for next in graph.complete(node) {
                launch(next, &mut actions, &names, &done_tx);
            }
        }
        Ok(())
    }
}

fn launch(
    node: usize,
    actions: &mut [Option<BoxAction>],
    names: &[String],
    done: &mpsc::UnboundedSender<usize>,
) {
    let Some(action) = actions[node].take() else {
        return;
    };
    info!(task = %names[node], "starting task");

    let done = done.clone();
    tokio::spawn(async move {
        action().await;
        let _ = done.send(node);
    });
}
