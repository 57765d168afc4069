use std::time::Duration;

/// Lifecycle notifications emitted by a [`super::ProcSupervisor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcEvent {
    Spawned { pid: Option<u32> },
    /// The run ended; `code` is absent for spawn errors and signal deaths.
    Exited { failure: bool, code: Option<i32> },
    RestartScheduled { delay: Duration },
    Terminated,
}
