//! Sequencing of the requested stages.

use std::fmt;

use crate::core::StatusCode;
use crate::ops::finalize::SessionFinalizer;
use crate::ops::{compile, generate, validate, StageContext, StageFailure};

/// Which stages to run after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Generate,
    Compile,
    GenerateThenCompile,
}

impl Mode {
    pub fn generates(self) -> bool {
        matches!(self, Mode::Generate | Mode::GenerateThenCompile)
    }

    pub fn compiles(self) -> bool {
        matches!(self, Mode::Compile | Mode::GenerateThenCompile)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Generate => write!(f, "gen"),
            Mode::Compile => write!(f, "build"),
            Mode::GenerateThenCompile => write!(f, "all"),
        }
    }
}

/// Validate, then run the stages `mode` selects, stopping at the first failure.
pub fn run_stages(ctx: &StageContext<'_>, mode: Mode) -> StatusCode {
    tracing::debug!(%mode, "running pipeline");
    match try_run_stages(ctx, mode) {
        Ok(()) => StatusCode::SUCCESS,
        Err(failure) => {
            failure.report(ctx.shell);
            failure.status()
        }
    }
}

fn try_run_stages(ctx: &StageContext<'_>, mode: Mode) -> Result<(), StageFailure> {
    validate(ctx)?;
    if mode.generates() {
        generate(ctx)?;
    }
    if mode.compiles() {
        compile(ctx)?;
    }
    Ok(())
}

/// Run the pipeline and end the session. Returns the process exit status.
pub fn run(ctx: &StageContext<'_>, mode: Mode, finalizer: &SessionFinalizer) -> StatusCode {
    finalizer.finalize(run_stages(ctx, mode))
}
