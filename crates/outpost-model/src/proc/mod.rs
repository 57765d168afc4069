mod kind;
pub use kind::ProcKind;

mod restart;
pub use restart::{RestartDelay, RestartPolicy};

mod spec;
pub use spec::ProcSpec;

mod user;
pub use user::ExecUser;
