mod error;
pub use error::{ExecError, ExecResult};

pub mod proc;
pub use proc::{ProcEvent, ProcState, ProcSupervisor};

mod util;

pub mod prelude {
    pub use crate::error::{ExecError, ExecResult};
    pub use crate::proc::{ProcEvent, ProcState, ProcSupervisor};
}
