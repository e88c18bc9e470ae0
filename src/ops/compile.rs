//! Compilation with ninja in the previously generated project.

use crate::core::CommandLine;
use crate::ops::{StageContext, StageFailure};
use crate::util::diagnostic::BestEffort;
use crate::util::fs::copy_into;
use crate::util::shell::Status;

/// Build the Ninja project.
///
/// Never generates on its own: a missing Ninja directory is a failure. On
/// success the sanitizer runtime, if present, is copied next to the output.
pub fn compile(ctx: &StageContext<'_>) -> Result<(), StageFailure> {
    let ninja_dir = ctx.paths.ninja_dir();
    if !ninja_dir.is_dir() {
        return Err(StageFailure::NotGenerated {
            dir: ninja_dir.to_path_buf(),
        });
    }

    let span = ctx.shell.span(
        Status::Compiling,
        format!("{} ({})", ctx.settings.variant, ctx.settings.arch),
    );
    ctx.run_bootstrapped_step("ninja build", CommandLine::new("ninja"), ninja_dir)?;

    if let Some(artifact) = ctx.tools.instrumentation_artifact() {
        let copy = if artifact.is_file() {
            BestEffort::attempt(|| copy_into(artifact, ninja_dir).map(drop))
        } else {
            tracing::debug!("no instrumentation artifact at {}", artifact.display());
            BestEffort::Skipped
        };
        copy.report(ctx.shell, Status::Copied, artifact.display());
    }

    span.finish();
    Ok(())
}
