//! Stagehand - conan, CMake and Ninja behind one command
//!
//! This crate drives an external dependency manager, project generator and
//! build runner through a fixed pipeline (validate, generate, compile),
//! running the compiler-facing steps inside an environment produced by a
//! bootstrap script such as `vcvarsall.bat`.

pub mod core;
pub mod ops;
pub mod util;

/// Recording runner and project fixtures for unit tests.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{BuildSettings, BuildVariant, CommandLine, ProjectPaths, StatusCode, ToolLocations};
pub use ops::{Mode, SessionFinalizer, StageContext, StageFailure};
pub use util::context::GlobalContext;
pub use util::process::{ProcessRunner, SystemRunner};
