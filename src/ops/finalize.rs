//! End-of-session behaviour for an interactively launched tool.
//!
//! After success the window stays up for a short grace period; after failure
//! it stays until the operator acknowledges. Both are skipped in
//! non-interactive mode.

use std::io::{self, BufRead, IsTerminal};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::core::StatusCode;
use crate::util::shell::{format_duration, Shell, Status};

/// How long a successful run lingers before exiting.
pub const SUCCESS_GRACE: Duration = Duration::from_secs(5);

/// How long a failed run lingers when nobody can acknowledge it.
pub const FALLBACK_WAIT: Duration = Duration::from_secs(5);

/// Waits for the operator to see a failure.
pub trait Acknowledge {
    fn acknowledge(&self, shell: &Shell);
}

/// Block until the operator presses Enter.
#[derive(Debug, Default)]
pub struct KeyPress;

impl Acknowledge for KeyPress {
    fn acknowledge(&self, shell: &Shell) {
        shell.status(Status::Waiting, "press Enter to exit");
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(n) if n > 0 => {}
            // EOF or a broken stdin: nobody is there to press anything
            _ => TimedFallback::default().acknowledge(shell),
        }
    }
}

/// Warn and wait a fixed time.
#[derive(Debug)]
pub struct TimedFallback {
    wait: Duration,
}

impl TimedFallback {
    pub fn new(wait: Duration) -> Self {
        TimedFallback { wait }
    }
}

impl Default for TimedFallback {
    fn default() -> Self {
        TimedFallback::new(FALLBACK_WAIT)
    }
}

impl Acknowledge for TimedFallback {
    fn acknowledge(&self, shell: &Shell) {
        shell.warn(format!(
            "stdin is not available; exiting in {}",
            format_duration(self.wait)
        ));
        thread::sleep(self.wait);
    }
}

/// Pick the acknowledgment strategy for this process's stdin.
pub fn detect_acknowledge() -> Box<dyn Acknowledge> {
    if io::stdin().is_terminal() {
        Box::new(KeyPress)
    } else {
        Box::new(TimedFallback::default())
    }
}

/// Decides how the session ends for a given status.
pub struct SessionFinalizer {
    shell: Arc<Shell>,
    non_interactive: bool,
    grace: Duration,
    acknowledge: Box<dyn Acknowledge>,
}

impl SessionFinalizer {
    pub fn new(shell: Arc<Shell>, non_interactive: bool) -> Self {
        SessionFinalizer {
            shell,
            non_interactive,
            grace: SUCCESS_GRACE,
            acknowledge: detect_acknowledge(),
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn with_acknowledge(mut self, acknowledge: Box<dyn Acknowledge>) -> Self {
        self.acknowledge = acknowledge;
        self
    }

    /// Linger or wait as appropriate, then hand `status` back unchanged.
    pub fn finalize(&self, status: StatusCode) -> StatusCode {
        if self.non_interactive {
            return status;
        }

        if status.is_success() {
            if !self.grace.is_zero() {
                self.shell.status(
                    Status::Finished,
                    format!("all steps succeeded; exiting in {}", format_duration(self.grace)),
                );
                thread::sleep(self.grace);
            }
        } else {
            self.acknowledge.acknowledge(&self.shell);
        }
        status
    }
}
