//! Remediation hints and advisory outcomes.
//!
//! Every fatal message tells the operator what to change. Optional side
//! effects report through [`BestEffort`] so a failed cleanup or copy is
//! visibly distinct from a pipeline failure.

use std::fmt::Display;

use anyhow::Result;

use crate::util::shell::{Shell, Status};

/// Common suggestion messages.
pub mod suggestions {
    /// The bootstrap script path is wrong for this machine.
    pub const BOOTSTRAP_MISSING: &str = "help: Set `tools.bootstrap_script` in stagehand.toml \
         or pass --bootstrap-script to point at your vcvarsall.bat";

    /// Compile was requested before generation.
    pub const NOT_GENERATED: &str =
        "help: Run `stagehand --action gen` or `stagehand --action all` first";

    /// An executable could not be found on PATH.
    pub const NOT_FOUND: &str =
        "help: Make sure conan, cmake and ninja are installed and on your PATH";

    /// An external tool failed.
    pub const REPRODUCE: &str =
        "help: Re-run the command above from the same directory to reproduce";
}

/// Outcome of an optional side effect.
///
/// Only `Advisory` carries an error, and it is never turned into a status.
#[must_use]
#[derive(Debug)]
pub enum BestEffort {
    /// The side effect happened.
    Done,
    /// Nothing to do.
    Skipped,
    /// The side effect failed; the primary operation carries on.
    Advisory(anyhow::Error),
}

impl BestEffort {
    /// Run `f`, capturing any error as advisory.
    pub fn attempt(f: impl FnOnce() -> Result<()>) -> Self {
        match f() {
            Ok(()) => BestEffort::Done,
            Err(e) => BestEffort::Advisory(e),
        }
    }

    pub fn is_advisory(&self) -> bool {
        matches!(self, BestEffort::Advisory(_))
    }

    /// Report the outcome: success as `done`, advisories as warnings.
    pub fn report(self, shell: &Shell, status: Status, done: impl Display) {
        match self {
            BestEffort::Done => shell.status(status, done),
            BestEffort::Skipped => {}
            advisory @ BestEffort::Advisory(_) => advisory.warn_if_failed(shell),
        }
    }

    /// Report only an advisory failure.
    pub fn warn_if_failed(self, shell: &Shell) {
        if let BestEffort::Advisory(e) = self {
            tracing::debug!("advisory failure: {:?}", e);
            shell.warn(format!("{:#}", e));
        }
    }
}
