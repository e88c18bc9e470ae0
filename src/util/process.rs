//! Subprocess execution with live, merged output.
//!
//! Every external tool runs through a [`ProcessRunner`]. The system runner
//! points the child's stdout and stderr at one OS pipe, so the relayed stream
//! keeps the order the child wrote in, and forwards it line by line while the
//! child is still running. Each call blocks until the child exits.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use tempfile::TempPath;
use thiserror::Error;

use crate::core::{CommandLine, StatusCode};
use crate::util::diagnostic::{suggestions, BestEffort};
use crate::util::shell::{Shell, Status};

/// Environment bootstrap applied before an inner command.
///
/// On Unix the script is sourced, so one that calls `exit` fails the step
/// without running the inner command. On Windows it is `call`ed, and a bare
/// `exit` (rather than `exit /b`) in it ends the whole step with its status.
#[derive(Debug, Clone, Copy)]
pub struct Bootstrap<'a> {
    /// Script that mutates the shell environment, e.g. `vcvarsall.bat`.
    pub script: &'a Path,
    /// Architecture tag passed as the script's only argument.
    pub arch: &'a str,
}

/// Runs external commands and reports their status.
pub trait ProcessRunner {
    /// Run `command`, relaying its merged output live.
    ///
    /// Returns the child's exit status, [`StatusCode::NOT_FOUND`] if the
    /// executable cannot be located, or [`StatusCode::LAUNCH_FAILED`] for any
    /// other launch error.
    fn run(&self, command: &CommandLine, cwd: Option<&Path>) -> StatusCode;

    /// Run `inner` in the same shell invocation as `bootstrap`, after it.
    ///
    /// If the bootstrap script fails, its status is returned and `inner`
    /// never runs.
    fn run_in_environment(
        &self,
        inner: &CommandLine,
        bootstrap: &Bootstrap<'_>,
        cwd: Option<&Path>,
    ) -> StatusCode;
}

/// Failure to start a child process.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("could not find executable `{program}`")]
    NotFound { program: String },

    #[error("empty command")]
    Empty,

    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    pub fn status(&self) -> StatusCode {
        match self {
            LaunchError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::LAUNCH_FAILED,
        }
    }
}

/// Where relayed child output is written.
pub type OutputSink = Box<dyn Write + Send>;

/// Runner that spawns real processes.
pub struct SystemRunner {
    shell: Arc<Shell>,
    output: Mutex<OutputSink>,
}

impl SystemRunner {
    /// Relay child output to this process's stdout.
    pub fn new(shell: Arc<Shell>) -> Self {
        SystemRunner::with_output(shell, Box::new(io::stdout()))
    }

    /// Relay child output to `output`.
    pub fn with_output(shell: Arc<Shell>, output: OutputSink) -> Self {
        SystemRunner {
            shell,
            output: Mutex::new(output),
        }
    }

    fn announce(&self, command: &CommandLine, cwd: Option<&Path>) {
        self.shell.status(Status::Running, command);
        if let Some(cwd) = cwd {
            self.shell.detail(format!("(cwd: {})", cwd.display()));
        }
        tracing::debug!(command = %command, cwd = ?cwd, "launching");
    }

    fn execute(&self, command: &CommandLine, cwd: Option<&Path>) -> StatusCode {
        match self.spawn_and_relay(command, cwd) {
            Ok(status) => {
                tracing::debug!(%status, "child exited");
                status
            }
            Err(e) => {
                self.shell.error(&e);
                if matches!(e, LaunchError::NotFound { .. }) {
                    self.shell.error_detail(suggestions::NOT_FOUND);
                }
                e.status()
            }
        }
    }

    fn spawn_and_relay(
        &self,
        command: &CommandLine,
        cwd: Option<&Path>,
    ) -> Result<StatusCode, LaunchError> {
        let program = command.program().unwrap_or(SHELL_NAME).to_string();
        let spawn_err = |source: io::Error| {
            if source.kind() == io::ErrorKind::NotFound {
                LaunchError::NotFound {
                    program: program.clone(),
                }
            } else {
                LaunchError::Spawn {
                    program: program.clone(),
                    source,
                }
            }
        };

        let (reader, writer) = io::pipe().map_err(spawn_err)?;
        let mut child = {
            let mut cmd = build_command(command, cwd)?;
            cmd.stdin(Stdio::inherit())
                .stdout(writer.try_clone().map_err(spawn_err)?)
                .stderr(writer);
            cmd.spawn().map_err(spawn_err)?
            // `cmd` drops here with our copies of the write end, so the
            // reader sees EOF once the child exits.
        };

        {
            let mut out = self.output.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = relay_lines(reader, &mut *out) {
                tracing::warn!("stopped relaying output of `{}`: {}", program, e);
            }
        }

        let status = child
            .wait()
            .map_err(|source| LaunchError::Wait { program, source })?;
        Ok(status.into())
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, command: &CommandLine, cwd: Option<&Path>) -> StatusCode {
        self.announce(command, cwd);
        self.execute(command, cwd)
    }

    fn run_in_environment(
        &self,
        inner: &CommandLine,
        bootstrap: &Bootstrap<'_>,
        cwd: Option<&Path>,
    ) -> StatusCode {
        self.announce(inner, cwd);
        self.shell.detail(format!(
            "(env: {} {})",
            bootstrap.script.display(),
            bootstrap.arch
        ));

        let script = match EnvironmentScript::create(inner, bootstrap) {
            Ok(script) => script,
            Err(e) => {
                self.shell.error(format!("{:#}", e));
                return StatusCode::LAUNCH_FAILED;
            }
        };
        tracing::debug!(script = %script.path().display(), "wrote environment script");

        let status = self.execute(&script.command(), cwd);
        script.remove().warn_if_failed(&self.shell);
        status
    }
}

/// Forward `reader` to `out` one line at a time, decoding lossily.
pub fn relay_lines(reader: impl Read, out: &mut dyn Write) -> io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        out.write_all(String::from_utf8_lossy(&buf).as_bytes())?;
        out.flush()?;
    }
}

/// A transient script that bootstraps the environment and runs one command.
///
/// The file is deleted when this value is dropped, whatever happened in
/// between.
pub struct EnvironmentScript {
    path: TempPath,
}

impl EnvironmentScript {
    pub fn create(inner: &CommandLine, bootstrap: &Bootstrap<'_>) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("stagehand-env-")
            .suffix(SCRIPT_SUFFIX)
            .tempfile()
            .context("failed to create environment script")?;
        file.write_all(render_script(inner, bootstrap).as_bytes())
            .and_then(|()| file.flush())
            .with_context(|| {
                format!(
                    "failed to write environment script: {}",
                    file.path().display()
                )
            })?;

        // Close the handle so the interpreter can open the file on Windows
        Ok(EnvironmentScript {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Interpreter invocation that executes this script.
    pub fn command(&self) -> CommandLine {
        interpreter().args(script_args(&self.path))
    }

    /// Delete the script now.
    pub fn remove(self) -> BestEffort {
        let display = self.path.display().to_string();
        BestEffort::attempt(|| {
            self.path
                .close()
                .with_context(|| format!("failed to remove environment script: {}", display))
        })
    }
}

fn build_command(command: &CommandLine, cwd: Option<&Path>) -> Result<Command, LaunchError> {
    let mut cmd = match command {
        CommandLine::Args(args) => {
            let (program, rest) = args.split_first().ok_or(LaunchError::Empty)?;
            let mut cmd = Command::new(resolve_program(program)?);
            cmd.args(rest);
            cmd
        }
        CommandLine::Shell(line) => shell_command(line),
    };
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    Ok(cmd)
}

/// Resolve a bare program name through `PATH`.
///
/// Programs given with a directory component are used as-is.
fn resolve_program(program: &str) -> Result<PathBuf, LaunchError> {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return Ok(path.to_path_buf());
    }
    find_executable(program).ok_or_else(|| LaunchError::NotFound {
        program: program.to_string(),
    })
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

#[cfg(unix)]
const SHELL_NAME: &str = "sh";
#[cfg(windows)]
const SHELL_NAME: &str = "cmd";

#[cfg(unix)]
const SCRIPT_SUFFIX: &str = ".sh";
#[cfg(windows)]
const SCRIPT_SUFFIX: &str = ".cmd";

#[cfg(unix)]
fn interpreter() -> CommandLine {
    CommandLine::new("/bin/sh")
}

#[cfg(windows)]
fn interpreter() -> CommandLine {
    let comspec = std::env::var("ComSpec").unwrap_or_else(|_| "cmd.exe".to_string());
    CommandLine::new(comspec).args(["/d", "/c"])
}

fn script_args(path: &Path) -> [String; 1] {
    [path.display().to_string()]
}

#[cfg(unix)]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c").arg(line);
    cmd
}

#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    use std::os::windows::process::CommandExt;

    let comspec = std::env::var("ComSpec").unwrap_or_else(|_| "cmd.exe".to_string());
    let mut cmd = Command::new(comspec);
    cmd.args(["/d", "/s", "/c"]).raw_arg(format!("\"{}\"", line));
    cmd
}

/// Script text: bootstrap, bail on failure, run the inner command, exit with its status.
#[cfg(unix)]
fn render_script(inner: &CommandLine, bootstrap: &Bootstrap<'_>) -> String {
    let inner = match inner {
        CommandLine::Shell(line) => line.clone(),
        CommandLine::Args(args) => args
            .iter()
            .map(|a| sh_quote(a))
            .collect::<Vec<_>>()
            .join(" "),
    };
    [
        "#!/bin/sh".to_string(),
        // `.` takes no arguments portably; the sourced script sees these
        format!("set -- {}", sh_quote(bootstrap.arch)),
        // A sourced script that calls `exit` ends this shell too
        EARLY_EXIT_TRAP.to_string(),
        format!(
            ". {} || {{ status=$?; trap - EXIT; exit $status; }}",
            sh_quote(&bootstrap.script.display().to_string())
        ),
        "trap - EXIT".to_string(),
        "set --".to_string(),
        inner,
        "exit $?".to_string(),
        String::new(),
    ]
    .join("\n")
}

/// Fails the script, never with 0, if the bootstrap script exits the shell.
#[cfg(unix)]
const EARLY_EXIT_TRAP: &str = r#"trap 'status=$?; [ $status -ne 0 ] || status=1; echo "bootstrap script exited before the command ran" >&2; exit $status' EXIT"#;

#[cfg(windows)]
fn render_script(inner: &CommandLine, bootstrap: &Bootstrap<'_>) -> String {
    [
        "@echo off".to_string(),
        format!(
            "call \"{}\" {}",
            bootstrap.script.display(),
            bootstrap.arch
        ),
        "if errorlevel 1 exit /b %errorlevel%".to_string(),
        inner.to_command_line(),
        "exit /b %errorlevel%".to_string(),
        String::new(),
    ]
    .join("\r\n")
}

/// Quote a token for a POSIX shell.
#[cfg(unix)]
fn sh_quote(token: &str) -> String {
    let safe = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if safe {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', r"'\''"))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::util::shell::{ColorChoice, Verbosity};
    use std::fs;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    /// Output sink the test can read back.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    /// Output sink recording when each write arrived.
    #[derive(Clone, Default)]
    struct Timed(Arc<Mutex<Vec<(Instant, Vec<u8>)>>>);

    impl Write for Timed {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().push((Instant::now(), buf.to_vec()));
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn runner() -> (SystemRunner, Captured) {
        let shell = Arc::new(Shell::new(Verbosity::Quiet, ColorChoice::Never));
        let captured = Captured::default();
        (
            SystemRunner::with_output(shell, Box::new(captured.clone())),
            captured,
        )
    }

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_run_returns_exit_status() {
        let (runner, _) = runner();
        assert_eq!(
            runner.run(&CommandLine::shell("exit 0"), None),
            StatusCode::SUCCESS
        );
        assert_eq!(
            runner.run(&CommandLine::shell("echo noise; exit 7"), None),
            StatusCode::new(7)
        );
    }

    #[test]
    fn test_run_args_form() {
        let (runner, out) = runner();
        let status = runner.run(&CommandLine::new("echo").args(["a b", "$HOME"]), None);
        assert_eq!(status, StatusCode::SUCCESS);
        // No shell expansion for argument vectors
        assert_eq!(out.text(), "a b $HOME\n");
    }

    #[test]
    fn test_missing_executable_is_not_found() {
        let (runner, _) = runner();
        let status = runner.run(&CommandLine::new("stagehand-definitely-not-a-tool"), None);
        assert_eq!(status, StatusCode::NOT_FOUND);

        let status = runner.run(&CommandLine::new("/nonexistent/dir/tool"), None);
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_merged_output_keeps_order() {
        let (runner, out) = runner();
        let status = runner.run(
            &CommandLine::shell("echo one; echo two >&2; echo three; echo four >&2"),
            None,
        );
        assert_eq!(status, StatusCode::SUCCESS);
        assert_eq!(out.text(), "one\ntwo\nthree\nfour\n");
    }

    #[test]
    fn test_output_is_relayed_while_child_runs() {
        let shell = Arc::new(Shell::new(Verbosity::Quiet, ColorChoice::Never));
        let sink = Timed::default();
        let runner = SystemRunner::with_output(shell, Box::new(sink.clone()));

        let status = runner.run(&CommandLine::shell("echo first; sleep 1; echo second"), None);
        let returned = Instant::now();

        assert_eq!(status, StatusCode::SUCCESS);
        let writes = sink.0.lock().unwrap();
        let (first_at, first) = &writes[0];
        assert_eq!(first, b"first\n");
        assert!(returned.duration_since(*first_at) >= Duration::from_millis(500));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let (runner, out) = runner();
        let status = runner.run(&CommandLine::shell(r"printf 'ok\377\n'"), None);
        assert_eq!(status, StatusCode::SUCCESS);
        assert_eq!(out.text(), "ok\u{FFFD}\n");
    }

    #[test]
    fn test_cwd_is_applied() {
        let tmp = TempDir::new().unwrap();
        let (runner, _) = runner();
        let status = runner.run(&CommandLine::shell("touch marker"), Some(tmp.path()));
        assert_eq!(status, StatusCode::SUCCESS);
        assert!(tmp.path().join("marker").exists());
    }

    #[test]
    fn test_relay_lines_without_trailing_newline() {
        let mut out = Vec::new();
        relay_lines(&b"first\nlast"[..], &mut out).unwrap();
        assert_eq!(out, b"first\nlast");
    }

    #[test]
    fn test_environment_is_visible_to_inner_command() {
        let tmp = TempDir::new().unwrap();
        let boot = write_script(
            tmp.path(),
            "boot.sh",
            "STAGEHAND_ARCH=\"$1\"\nexport STAGEHAND_ARCH\n",
        );
        let (runner, out) = runner();
        let status = runner.run_in_environment(
            &CommandLine::shell("echo \"arch=$STAGEHAND_ARCH\""),
            &Bootstrap {
                script: &boot,
                arch: "x64",
            },
            None,
        );
        assert_eq!(status, StatusCode::SUCCESS);
        assert_eq!(out.text(), "arch=x64\n");
    }

    #[test]
    fn test_failed_bootstrap_skips_inner_command() {
        let tmp = TempDir::new().unwrap();
        let boot = write_script(tmp.path(), "boot.sh", "return 5\n");
        let marker = tmp.path().join("ran");
        let (runner, _) = runner();
        let status = runner.run_in_environment(
            &CommandLine::new("touch").arg(&marker),
            &Bootstrap {
                script: &boot,
                arch: "x64",
            },
            None,
        );
        assert_eq!(status, StatusCode::new(5));
        assert!(!marker.exists());
    }

    #[test]
    fn test_bootstrap_exit_fails_step() {
        let tmp = TempDir::new().unwrap();
        let marker = tmp.path().join("ran");
        let (runner, _) = runner();

        for (body, expected) in [("exit 0\n", 1), ("exit 6\n", 6)] {
            let boot = write_script(tmp.path(), "boot.sh", body);
            let status = runner.run_in_environment(
                &CommandLine::new("touch").arg(&marker),
                &Bootstrap {
                    script: &boot,
                    arch: "x64",
                },
                None,
            );
            assert_eq!(status, StatusCode::new(expected));
            assert!(!marker.exists());
        }
    }

    #[test]
    fn test_inner_status_is_propagated() {
        let tmp = TempDir::new().unwrap();
        let boot = write_script(tmp.path(), "boot.sh", "true\n");
        let (runner, _) = runner();
        let status = runner.run_in_environment(
            &CommandLine::shell("exit 9"),
            &Bootstrap {
                script: &boot,
                arch: "x64",
            },
            None,
        );
        assert_eq!(status, StatusCode::new(9));
    }

    #[test]
    fn test_environment_script_is_removed() {
        let tmp = TempDir::new().unwrap();
        let boot = write_script(tmp.path(), "boot.sh", "true\n");
        let seen = tmp.path().join("script-path");
        let (runner, _) = runner();

        for exit in ["exit 0", "exit 4"] {
            // $0 is the transient script itself
            let inner = CommandLine::shell(format!(
                "printf '%s' \"$0\" > '{}'; {}",
                seen.display(),
                exit
            ));
            runner.run_in_environment(
                &inner,
                &Bootstrap {
                    script: &boot,
                    arch: "x64",
                },
                None,
            );
            let script = PathBuf::from(fs::read_to_string(&seen).unwrap());
            assert!(script.to_string_lossy().contains("stagehand-env-"));
            assert!(!script.exists());
        }
    }

    #[test]
    fn test_environment_script_drop_removes_file() {
        let script = EnvironmentScript::create(
            &CommandLine::new("ninja"),
            &Bootstrap {
                script: Path::new("/opt/env.sh"),
                arch: "x64",
            },
        )
        .unwrap();
        let path = script.path().to_path_buf();
        assert!(path.exists());
        drop(script);
        assert!(!path.exists());
    }

    #[test]
    fn test_render_script_quotes_tokens() {
        let text = render_script(
            &CommandLine::new("cmake").args(["-G", "Ninja", "-S", "/src dir"]),
            &Bootstrap {
                script: Path::new("/opt/my env.sh"),
                arch: "x64",
            },
        );
        assert!(text.contains(". '/opt/my env.sh' || {"));
        assert!(text.contains("cmake -G Ninja -S '/src dir'"));
        assert!(text.ends_with("exit $?\n"));
    }

    #[test]
    fn test_sh_quote() {
        assert_eq!(sh_quote("plain-token"), "plain-token");
        assert_eq!(sh_quote(""), "''");
        assert_eq!(sh_quote("it's"), r"'it'\''s'");
    }
}
