pub mod config;
pub use config::{AgentConfig, ConfigError, ProcessConfig};

pub mod runner;
pub use runner::{build_tasks, launch};
