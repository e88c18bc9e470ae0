//! Pre-flight checks that run before any external tool.

use crate::ops::{StageContext, StageFailure};

/// Check that the bootstrap script exists. Touches nothing.
pub fn validate(ctx: &StageContext<'_>) -> Result<(), StageFailure> {
    let script = ctx.tools.bootstrap_script();
    if !script.exists() {
        return Err(StageFailure::MissingBootstrap {
            path: script.to_path_buf(),
        });
    }
    tracing::debug!("bootstrap script: {}", script.display());
    Ok(())
}
