//! Supervision of one external executable.
//!
//! ```text
//!   ┌──────────► Running ── exit ──► policy.should_restart(failure)?
//!   │                                   │ yes                 │ no
//!   └──── sleep(delay) ◄─ AwaitingRestart                  Terminal
//! ```
//!
//! A spawn error, a wait error, a non-zero exit and a signal death all count as
//! failure. Failures are logged and only feed the restart decision; `run` never
//! returns an error.
mod delay;
mod event;
mod state;

use outpost_model::{ProcKind, ProcSpec};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

pub use delay::DelaySampler;
pub use event::ProcEvent;
pub use state::ProcState;

use crate::{
    error::{ExecError, ExecResult},
    util::{check_status, cmd_program},
};

/// Owns the restart loop of one [`ProcSpec`].
///
/// Runs are strictly sequential: the next spawn happens only after the previous
/// child was reaped and the restart delay elapsed.
#[derive(Debug)]
pub struct ProcSupervisor {
    spec: ProcSpec,
    delays: DelaySampler,
    events: Option<UnboundedSender<ProcEvent>>,
}

impl ProcSupervisor {
    pub fn new(spec: ProcSpec) -> Self {
        Self {
            delays: DelaySampler::new(spec.delay()),
            spec,
            events: None,
        }
    }

    /// Deterministic jitter.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.delays = DelaySampler::seeded(self.spec.delay(), seed);
        self
    }

    /// Publish lifecycle events to `tx`. A closed receiver is ignored.
    pub fn with_events(mut self, tx: UnboundedSender<ProcEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    #[inline]
    pub fn spec(&self) -> &ProcSpec {
        &self.spec
    }

    /// Drives the state machine until it reaches [`ProcState::Terminal`].
    ///
    /// With [`outpost_model::RestartPolicy::Always`] this never returns.
    pub async fn run(mut self) {
        info!(
            proc = %self.spec.description(),
            exec = %self.spec.exec_path().display(),
            restart = ?self.spec.restart(),
            user = self.spec.user().as_str(),
            "supervising process"
        );

        let mut state = ProcState::Running;
        loop {
            state = match state {
                ProcState::Running => {
                    let failure = match self.run_once().await {
                        Ok(()) => {
                            info!(proc = %self.spec.description(), "process exited cleanly");
                            self.emit(ProcEvent::Exited { failure: false, code: Some(0) });
                            false
                        }
                        Err(e) => {
                            warn!(proc = %self.spec.description(), error = %e, "process failed");
                            self.emit(ProcEvent::Exited { failure: true, code: e.exit_code() });
                            true
                        }
                    };
                    ProcState::after_exit(self.spec.restart(), failure)
                }
                ProcState::AwaitingRestart => {
                    let delay = self.delays.next_delay();
                    info!(proc = %self.spec.description(), delay_ms = delay.as_millis() as u64, "restart scheduled");
                    self.emit(ProcEvent::RestartScheduled { delay });
                    tokio::time::sleep(delay).await;
                    ProcState::Running
                }
                ProcState::Terminal => {
                    info!(proc = %self.spec.description(), "supervision finished");
                    self.emit(ProcEvent::Terminated);
                    return;
                }
            };
        }
    }

    /// Starts supervision according to the process kind.
    ///
    /// A one-shot is awaited to `Terminal`; a daemon is spawned on its own task
    /// and this returns at once.
    pub async fn start(self) {
        match self.spec.kind() {
            ProcKind::OneShot => self.run().await,
            ProcKind::Daemon => {
                tokio::spawn(self.run());
            }
        }
    }

    async fn run_once(&mut self) -> ExecResult<()> {
        if self.spec.exec_path().as_os_str().is_empty() {
            return Err(ExecError::MissingProgram);
        }

        let mut child = cmd_program(self.spec.exec_path(), self.spec.args())
            .spawn()
            .map_err(ExecError::Spawn)?;
        let pid = child.id();
        debug!(proc = %self.spec.description(), ?pid, "process spawned");
        self.emit(ProcEvent::Spawned { pid });

        let status = child.wait().await.map_err(ExecError::Wait)?;
        check_status(status)
    }

    fn emit(&self, event: ProcEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}
