use outpost_model::RestartPolicy;

/// Where the supervision loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    Running,
    AwaitingRestart,
    Terminal,
}

impl ProcState {
    /// State entered after a run ends.
    pub fn after_exit(policy: RestartPolicy, failure: bool) -> Self {
        if policy.should_restart(failure) {
            ProcState::AwaitingRestart
        } else {
            ProcState::Terminal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions() {
        use ProcState::*;
        assert_eq!(ProcState::after_exit(RestartPolicy::Always, false), AwaitingRestart);
        assert_eq!(ProcState::after_exit(RestartPolicy::Always, true), AwaitingRestart);
        assert_eq!(ProcState::after_exit(RestartPolicy::OnFailure, true), AwaitingRestart);
        assert_eq!(ProcState::after_exit(RestartPolicy::OnFailure, false), Terminal);
        assert_eq!(ProcState::after_exit(RestartPolicy::Never, true), Terminal);
        assert_eq!(ProcState::after_exit(RestartPolicy::Never, false), Terminal);
    }
}
