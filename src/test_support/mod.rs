//! Test utilities for Stagehand unit tests.
//!
//! [`RecordingRunner`] stands in for the system runner: it records every
//! invocation and answers with scripted status codes, so stage logic can be
//! tested without conan, cmake or ninja installed.
//!
//! # Example
//!
//! ```rust,ignore
//! let runner = RecordingRunner::new().fail_on(CommandPattern::StartsWith("conan".into()), 7);
//! // ... run a stage against `runner` ...
//! assert_eq!(runner.programs(), ["conan"]);
//! ```

pub mod fixtures;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::core::{CommandLine, StatusCode};
use crate::util::process::{Bootstrap, ProcessRunner};

pub use fixtures::*;

/// Pattern for matching rendered command lines.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Exact match on full command string.
    Exact(String),
    /// Match if command starts with prefix.
    StartsWith(String),
    /// Match if command contains substring.
    Contains(String),
    /// Match any command.
    Any,
}

impl CommandPattern {
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s.as_str()),
            CommandPattern::Contains(s) => cmd.contains(s.as_str()),
            CommandPattern::Any => true,
        }
    }
}

/// One recorded call to the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Rendered command line.
    pub command: String,
    pub cwd: Option<PathBuf>,
    /// Bootstrap script, when run through `run_in_environment`.
    pub bootstrap: Option<(PathBuf, String)>,
}

impl Invocation {
    /// First token of the command line.
    pub fn program(&self) -> &str {
        self.command.split_whitespace().next().unwrap_or("")
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrap.is_some()
    }
}

/// Runner that records invocations instead of spawning processes.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    responses: Vec<(CommandPattern, StatusCode)>,
    creates: Vec<(CommandPattern, PathBuf)>,
    calls: Mutex<Vec<Invocation>>,
}

impl RecordingRunner {
    /// Every command succeeds unless scripted otherwise.
    pub fn new() -> Self {
        RecordingRunner::default()
    }

    /// Return `status` for commands matching `pattern`. First match wins.
    pub fn fail_on(mut self, pattern: CommandPattern, status: i32) -> Self {
        self.responses.push((pattern, StatusCode::new(status)));
        self
    }

    /// Create `dir` when a matching command runs, as a real generator would.
    pub fn creating_dir_on(mut self, pattern: CommandPattern, dir: impl Into<PathBuf>) -> Self {
        self.creates.push((pattern, dir.into()));
        self
    }

    /// All recorded invocations, in call order.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Program of each recorded invocation, in call order.
    pub fn programs(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| c.program().to_string())
            .collect()
    }

    fn record(&self, invocation: Invocation) -> StatusCode {
        let status = self
            .responses
            .iter()
            .find(|(pattern, _)| pattern.matches(&invocation.command))
            .map(|(_, status)| *status)
            .unwrap_or(StatusCode::SUCCESS);
        for (pattern, dir) in &self.creates {
            if pattern.matches(&invocation.command) {
                std::fs::create_dir_all(dir).unwrap();
            }
        }
        self.calls.lock().unwrap().push(invocation);
        status
    }
}

impl ProcessRunner for RecordingRunner {
    fn run(&self, command: &CommandLine, cwd: Option<&Path>) -> StatusCode {
        self.record(Invocation {
            command: command.to_command_line(),
            cwd: cwd.map(Path::to_path_buf),
            bootstrap: None,
        })
    }

    fn run_in_environment(
        &self,
        inner: &CommandLine,
        bootstrap: &Bootstrap<'_>,
        cwd: Option<&Path>,
    ) -> StatusCode {
        self.record(Invocation {
            command: inner.to_command_line(),
            cwd: cwd.map(Path::to_path_buf),
            bootstrap: Some((bootstrap.script.to_path_buf(), bootstrap.arch.to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_pattern() {
        assert!(CommandPattern::Exact("ninja".into()).matches("ninja"));
        assert!(!CommandPattern::Exact("ninja".into()).matches("ninja -v"));
        assert!(CommandPattern::StartsWith("conan".into()).matches("conan install"));
        assert!(CommandPattern::Contains("-G Ninja".into()).matches("cmake -G Ninja -S ."));
        assert!(CommandPattern::Any.matches("anything"));
    }

    #[test]
    fn test_recording_runner_scripts_status() {
        let runner = RecordingRunner::new()
            .fail_on(CommandPattern::StartsWith("conan".into()), 7);

        let status = runner.run(&CommandLine::new("conan").arg("install"), None);
        assert_eq!(status, StatusCode::new(7));

        let status = runner.run_in_environment(
            &CommandLine::new("ninja"),
            &Bootstrap {
                script: Path::new("vcvarsall.bat"),
                arch: "x64",
            },
            Some(Path::new("build/ninja")),
        );
        assert!(status.is_success());

        let calls = runner.calls();
        assert_eq!(runner.programs(), ["conan", "ninja"]);
        assert!(!calls[0].is_bootstrapped());
        assert!(calls[1].is_bootstrapped());
        assert_eq!(calls[1].cwd.as_deref(), Some(Path::new("build/ninja")));
    }
}
