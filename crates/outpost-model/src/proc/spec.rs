use std::path::PathBuf;

use super::{ExecUser, ProcKind, RestartDelay, RestartPolicy};

/// Everything needed to supervise one external executable.
///
/// Built with `with_*` methods; later calls override earlier ones.
/// Two coupling rules keep kind and restart policy consistent:
/// - choosing [`RestartPolicy::Always`] turns a one-shot into a daemon (it never finishes);
/// - choosing [`ProcKind::OneShot`] while the policy is `Always` demotes it to `OnFailure`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcSpec {
    exec_path: PathBuf,
    args: Vec<String>,
    description: String,
    restart: RestartPolicy,
    delay: RestartDelay,
    user: ExecUser,
    kind: ProcKind,
}

impl ProcSpec {
    /// Spec with defaults: no args, description = path, `Always`, jittered delay, restricted, daemon.
    pub fn new(exec_path: impl Into<PathBuf>) -> Self {
        let exec_path = exec_path.into();
        Self {
            description: exec_path.display().to_string(),
            exec_path,
            args: Vec::new(),
            restart: RestartPolicy::default(),
            delay: RestartDelay::default(),
            user: ExecUser::default(),
            kind: ProcKind::default(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = restart;
        if restart == RestartPolicy::Always && self.kind == ProcKind::OneShot {
            self.kind = ProcKind::Daemon;
        }
        self
    }

    /// Fixed pause between runs. Replaces any jitter setting.
    pub fn with_restart_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = RestartDelay::Fixed(delay);
        self
    }

    /// Jittered pause between runs. Replaces any fixed delay.
    pub fn with_random_delay(mut self) -> Self {
        self.delay = RestartDelay::Jitter;
        self
    }

    pub fn with_user(mut self, user: ExecUser) -> Self {
        self.user = user;
        self
    }

    pub fn with_kind(mut self, kind: ProcKind) -> Self {
        self.kind = kind;
        if kind == ProcKind::OneShot && self.restart == RestartPolicy::Always {
            self.restart = RestartPolicy::OnFailure;
        }
        self
    }

    #[inline]
    pub fn exec_path(&self) -> &PathBuf {
        &self.exec_path
    }

    #[inline]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn restart(&self) -> RestartPolicy {
        self.restart
    }

    #[inline]
    pub fn delay(&self) -> RestartDelay {
        self.delay
    }

    #[inline]
    pub fn user(&self) -> ExecUser {
        self.user
    }

    #[inline]
    pub fn kind(&self) -> ProcKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn defaults() {
        let spec = ProcSpec::new("/opt/outpost/bin/runner");
        assert_eq!(spec.description(), "/opt/outpost/bin/runner");
        assert!(spec.args().is_empty());
        assert_eq!(spec.restart(), RestartPolicy::Always);
        assert_eq!(spec.delay(), RestartDelay::Jitter);
        assert_eq!(spec.user(), ExecUser::Restricted);
        assert_eq!(spec.kind(), ProcKind::Daemon);
    }

    #[test]
    fn random_delay_overrides_fixed() {
        let spec = ProcSpec::new("x")
            .with_restart_delay(Duration::from_secs(3))
            .with_random_delay();
        assert_eq!(spec.delay(), RestartDelay::Jitter);

        let spec = spec.with_restart_delay(Duration::from_millis(250));
        assert_eq!(spec.delay(), RestartDelay::Fixed(Duration::from_millis(250)));
    }

    #[test]
    fn one_shot_demotes_always() {
        let spec = ProcSpec::new("x").with_kind(ProcKind::OneShot);
        assert_eq!(spec.restart(), RestartPolicy::OnFailure);
        assert_eq!(spec.kind(), ProcKind::OneShot);
    }

    #[test]
    fn always_promotes_one_shot() {
        let spec = ProcSpec::new("x")
            .with_restart(RestartPolicy::Never)
            .with_kind(ProcKind::OneShot)
            .with_restart(RestartPolicy::Always);
        assert_eq!(spec.kind(), ProcKind::Daemon);
        assert_eq!(spec.restart(), RestartPolicy::Always);
    }

    #[test]
    fn one_shot_keeps_never() {
        let spec = ProcSpec::new("x")
            .with_restart(RestartPolicy::Never)
            .with_kind(ProcKind::OneShot)
            .with_args(["--setup"]);
        assert_eq!(spec.restart(), RestartPolicy::Never);
        assert_eq!(spec.args(), ["--setup".to_string()]);
    }
}
