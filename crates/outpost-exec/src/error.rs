use thiserror::Error;

/// Why a single run of a supervised process counts as failed.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("non-zero exit code: {code}")]
    NonZeroExit { code: i32 },
    #[error("spawn failed: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("wait failed: {0}")]
    Wait(#[source] std::io::Error),
    #[error("killed by signal")]
    KilledBySignal,
    #[error("missing program")]
    MissingProgram,
}

pub type ExecResult<T> = Result<T, ExecError>;

impl ExecError {
    /// Exit code, when the process got as far as exiting with one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecError::NonZeroExit { code } => Some(*code),
            _ => None,
        }
    }
}
