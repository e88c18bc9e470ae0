//! Shared utilities

pub mod config;
pub mod context;
pub mod diagnostic;
pub mod fs;
pub mod process;
pub mod shell;

pub use config::Config;
pub use context::GlobalContext;
pub use diagnostic::BestEffort;
pub use process::{Bootstrap, ProcessRunner, SystemRunner};
pub use shell::Shell;
