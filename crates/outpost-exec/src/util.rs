use std::{path::Path, process::ExitStatus, process::Stdio};

use tokio::process::Command;

use crate::error::{ExecError, ExecResult};

/// Command for one run: working directory `/`, no stdin, stdout/stderr shared with the daemon.
pub fn cmd_program(program: &Path, args: &[String]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args.iter().map(|s| s.as_str()))
        .current_dir("/")
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);
    cmd
}

pub fn check_status(status: ExitStatus) -> ExecResult<()> {
    if status.success() {
        return Ok(());
    }
    match status.code() {
        Some(code) => Err(ExecError::NonZeroExit { code }),
        None => Err(ExecError::KilledBySignal),
    }
}
