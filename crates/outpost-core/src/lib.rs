pub mod error;
pub use error::SchedulerError;

pub mod router;
pub use router::{Mailbox, MessageRouter, OverflowPolicy, SubscribeOptions, Subscription};

pub mod scheduler;
pub use scheduler::{ScheduledTask, Scheduler, TaskId};
