use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Decides whether a process is spawned again after it exits.
///
/// - `Always`: respawn unconditionally, forever.
/// - `OnFailure`: respawn after a spawn error or a non-zero exit; a clean exit is terminal.
/// - `Never`: a single run, whatever the outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RestartPolicy {
    #[default]
    Always,
    OnFailure,
    Never,
}

impl RestartPolicy {
    /// Returns `true` if a run that ended with `failure` must be followed by another one.
    #[inline]
    pub fn should_restart(&self, failure: bool) -> bool {
        match self {
            RestartPolicy::Always => true,
            RestartPolicy::OnFailure => failure,
            RestartPolicy::Never => false,
        }
    }
}

/// Pause inserted before a respawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RestartDelay {
    /// Sleep exactly this long.
    Fixed(Duration),
    /// Sleep a uniformly random duration in `[0, 10s)`.
    ///
    /// Spreads restarts of processes that failed together.
    #[default]
    Jitter,
}

impl RestartDelay {
    /// Upper bound (exclusive) of the jittered delay.
    pub const JITTER_CEILING: Duration = Duration::from_secs(10);
}
