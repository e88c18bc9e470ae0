//! Status codes threaded through the pipeline.

use std::fmt;
use std::process::ExitStatus;

/// A process-style status code. Zero is success, anything else a failure reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(i32);

impl StatusCode {
    /// Every requested step finished.
    pub const SUCCESS: StatusCode = StatusCode(0);

    /// A child could not be spawned for a reason other than a missing executable.
    pub const LAUNCH_FAILED: StatusCode = StatusCode(1);

    /// The bootstrap script does not exist.
    pub const VALIDATION_FAILED: StatusCode = StatusCode(2);

    /// Compile was requested before the Ninja project was generated.
    pub const NOT_GENERATED: StatusCode = StatusCode(3);

    /// The executable could not be located.
    pub const NOT_FOUND: StatusCode = StatusCode(127);

    pub const fn new(code: i32) -> Self {
        StatusCode(code)
    }

    pub const fn code(self) -> i32 {
        self.0
    }

    pub const fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl From<ExitStatus> for StatusCode {
    /// Children terminated by a signal carry no code and count as a generic failure.
    fn from(status: ExitStatus) -> Self {
        status
            .code()
            .map(StatusCode)
            .unwrap_or(StatusCode::LAUNCH_FAILED)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
