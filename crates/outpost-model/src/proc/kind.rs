use serde::{Deserialize, Serialize};

/// How a supervised process relates to ordered startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProcKind {
    /// Started in the background; dependents may start right away.
    #[default]
    Daemon,
    /// Must reach a terminal state before dependents start.
    OneShot,
}
