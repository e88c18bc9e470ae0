//! Operator-facing status output.
//!
//! Status lines go to stderr as `{status:>12} {message}` so that the relayed
//! output of external tools owns stdout. Stages report through the shell and
//! never format spacing themselves.

use std::fmt::Display;
use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// --quiet: errors and warnings only
    Quiet,
    #[default]
    Normal,
    /// --verbose: debug logging as well
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    Always,
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "invalid color choice '{}'; expected 'auto', 'always', or 'never'",
                s
            )),
        }
    }
}

/// Status types for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Success statuses (green)
    Finished,
    Copied,
    Removed,

    // In-progress statuses (cyan)
    Running,
    Generating,
    Compiling,

    // Warning statuses (yellow)
    Waiting,
    Warning,

    Error,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Finished => "Finished",
            Status::Copied => "Copied",
            Status::Removed => "Removed",
            Status::Running => "Running",
            Status::Generating => "Generating",
            Status::Compiling => "Compiling",
            Status::Waiting => "Waiting",
            Status::Warning => "Warning",
            Status::Error => "error",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            // Success: bold green
            Status::Finished | Status::Copied | Status::Removed => "\x1b[1;32m",
            // In-progress: bold cyan
            Status::Running | Status::Generating | Status::Compiling => "\x1b[1;36m",
            // Warning: bold yellow
            Status::Waiting | Status::Warning => "\x1b[1;33m",
            // Error: bold red
            Status::Error => "\x1b[1;31m",
        }
    }

    fn is_loud(&self) -> bool {
        matches!(self, Status::Error | Status::Warning | Status::Waiting)
    }
}

/// Width the status word is right-aligned to.
const STATUS_WIDTH: usize = 12;

/// Central shell for all operator output.
#[derive(Debug)]
pub struct Shell {
    verbosity: Verbosity,
    use_color: bool,
}

impl Shell {
    pub fn new(verbosity: Verbosity, color: ColorChoice) -> Self {
        let use_color = match color {
            ColorChoice::Auto => io::stderr().is_terminal(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        };
        Shell {
            verbosity,
            use_color,
        }
    }

    /// Create a shell from CLI flags. Quiet wins over verbose.
    pub fn from_flags(quiet: bool, verbose: bool, color: ColorChoice) -> Self {
        let verbosity = if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };
        Shell::new(verbosity, color)
    }

    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Print a status message.
    ///
    /// In quiet mode only errors, warnings and waits are printed.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_quiet() && !status.is_loud() {
            return;
        }
        eprintln!("{} {}", self.format_status(status), msg);
    }

    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    pub fn error(&self, msg: impl Display) {
        self.status(Status::Error, msg);
    }

    /// Print an indented continuation line under the previous status.
    pub fn detail(&self, msg: impl Display) {
        if self.is_quiet() {
            return;
        }
        eprintln!("{:width$} {}", "", msg, width = STATUS_WIDTH);
    }

    /// Print a continuation line under an error. Shown even when quiet.
    pub fn error_detail(&self, msg: impl Display) {
        eprintln!("{:width$} {}", "", msg, width = STATUS_WIDTH);
    }

    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();
        if self.use_color {
            format!(
                "{}{:>width$}\x1b[0m",
                status.color_code(),
                text,
                width = STATUS_WIDTH
            )
        } else {
            format!("{:>width$}", text, width = STATUS_WIDTH)
        }
    }

    /// Create a scoped span timing one stage.
    ///
    /// The start line is printed immediately; the end line with the elapsed
    /// time is printed by [`Span::finish`]. A span dropped without finishing
    /// prints nothing more, since the failure was already reported.
    pub fn span(self: &Arc<Self>, status: Status, msg: impl Display) -> Span {
        Span::new(Arc::clone(self), status, msg.to_string())
    }
}

/// A timed stage.
pub struct Span {
    shell: Arc<Shell>,
    message: String,
    start: Instant,
}

impl Span {
    fn new(shell: Arc<Shell>, status: Status, message: String) -> Self {
        shell.status(status, &message);
        Span {
            shell,
            message,
            start: Instant::now(),
        }
    }

    /// Report the stage as finished.
    pub fn finish(self) {
        let elapsed = format_duration(self.start.elapsed());
        self.shell
            .status(Status::Finished, format!("{} in {}", self.message, elapsed));
    }
}

/// Format a duration in a human-readable way.
pub(crate) fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}
