mod domain;
pub use domain::*;

mod proc;
pub use proc::*;
