//! Pipeline stages and the coordinator that sequences them.
//!
//! Stages run strictly in order (validate, generate, compile) and stop at the
//! first failure. Fatal outcomes are [`StageFailure`]s; optional side effects
//! go through [`BestEffort`](crate::util::BestEffort) and never fail a stage.

pub mod compile;
pub mod finalize;
pub mod generate;
pub mod pipeline;
pub mod validate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::core::{BuildSettings, CommandLine, ProjectPaths, StatusCode, ToolLocations};
use crate::util::diagnostic::suggestions;
use crate::util::process::{Bootstrap, ProcessRunner};
use crate::util::shell::Shell;

pub use compile::compile;
pub use finalize::SessionFinalizer;
pub use generate::generate;
pub use pipeline::{run, run_stages, Mode};
pub use validate::validate;

/// A fatal stage outcome.
#[derive(Debug, Error)]
pub enum StageFailure {
    #[error("bootstrap script not found: {}", path.display())]
    MissingBootstrap { path: PathBuf },

    #[error("Ninja project directory not found: {}", dir.display())]
    NotGenerated { dir: PathBuf },

    #[error("{step} failed with status {status}")]
    ToolFailed {
        step: &'static str,
        command: String,
        cwd: Option<PathBuf>,
        status: StatusCode,
    },

    #[error(transparent)]
    Filesystem(#[from] anyhow::Error),
}

impl StageFailure {
    /// Status the pipeline exits with.
    pub fn status(&self) -> StatusCode {
        match self {
            StageFailure::MissingBootstrap { .. } => StatusCode::VALIDATION_FAILED,
            StageFailure::NotGenerated { .. } => StatusCode::NOT_GENERATED,
            StageFailure::ToolFailed { status, .. } => *status,
            StageFailure::Filesystem(_) => StatusCode::LAUNCH_FAILED,
        }
    }

    /// Print the failure with what the operator should do about it.
    pub fn report(&self, shell: &Shell) {
        match self {
            StageFailure::MissingBootstrap { .. } => {
                shell.error(self);
                shell.error_detail(suggestions::BOOTSTRAP_MISSING);
            }
            StageFailure::NotGenerated { .. } => {
                shell.error(self);
                shell.error_detail(suggestions::NOT_GENERATED);
            }
            StageFailure::ToolFailed {
                command,
                cwd,
                status,
                ..
            } => {
                shell.error(self);
                shell.error_detail(format!("command: {}", command));
                if let Some(cwd) = cwd {
                    shell.error_detail(format!("cwd: {}", cwd.display()));
                }
                // The runner has already printed the PATH hint
                if *status != StatusCode::NOT_FOUND {
                    shell.error_detail(suggestions::REPRODUCE);
                }
            }
            StageFailure::Filesystem(e) => shell.error(format!("{:#}", e)),
        }
    }
}

/// Everything a stage needs, borrowed for the duration of one pipeline run.
pub struct StageContext<'a> {
    pub paths: &'a ProjectPaths,
    pub tools: &'a ToolLocations,
    pub settings: &'a BuildSettings,
    pub runner: &'a dyn ProcessRunner,
    pub shell: &'a Arc<Shell>,
}

impl StageContext<'_> {
    fn bootstrap(&self) -> Bootstrap<'_> {
        Bootstrap {
            script: self.tools.bootstrap_script(),
            arch: &self.settings.arch,
        }
    }

    /// Run a plain command as one step.
    fn run_step(
        &self,
        step: &'static str,
        command: CommandLine,
        cwd: &Path,
    ) -> Result<(), StageFailure> {
        let status = self.runner.run(&command, Some(cwd));
        check(step, command, cwd, status)
    }

    /// Run a command inside the bootstrapped compiler environment as one step.
    fn run_bootstrapped_step(
        &self,
        step: &'static str,
        command: CommandLine,
        cwd: &Path,
    ) -> Result<(), StageFailure> {
        let status = self
            .runner
            .run_in_environment(&command, &self.bootstrap(), Some(cwd));
        check(step, command, cwd, status)
    }
}

fn check(
    step: &'static str,
    command: CommandLine,
    cwd: &Path,
    status: StatusCode,
) -> Result<(), StageFailure> {
    if status.is_success() {
        return Ok(());
    }
    Err(StageFailure::ToolFailed {
        step,
        command: command.to_command_line(),
        cwd: Some(cwd.to_path_buf()),
        status,
    })
}
