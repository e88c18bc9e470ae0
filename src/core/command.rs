//! Commands handed to the process runner.

use std::ffi::OsStr;
use std::fmt;

/// An external command, either an opaque shell line or discrete argument tokens.
///
/// Both forms mean the same thing, but `Args` is never re-interpreted by a
/// shell. The only place an `Args` command passes through a shell is inside a
/// bootstrap script, where it is rendered with [`CommandLine::to_command_line`].
///
/// Tokens are stored as UTF-8. Paths that are not valid Unicode are converted
/// lossily, so such a project root reaches the tools with U+FFFD in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// A single line interpreted by the platform shell.
    Shell(String),
    /// Program followed by its arguments.
    Args(Vec<String>),
}

impl CommandLine {
    /// Create an argument-vector command for `program`.
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        CommandLine::Args(vec![program.as_ref().to_string_lossy().into_owned()])
    }

    /// Create a shell-line command.
    pub fn shell(line: impl Into<String>) -> Self {
        CommandLine::Shell(line.into())
    }

    /// Add a single argument.
    ///
    /// A shell line has the argument appended in quoted form.
    pub fn arg(self, arg: impl AsRef<OsStr>) -> Self {
        let arg = arg.as_ref().to_string_lossy().into_owned();
        match self {
            CommandLine::Args(mut args) => {
                args.push(arg);
                CommandLine::Args(args)
            }
            CommandLine::Shell(mut line) => {
                line.push(' ');
                line.push_str(&quote_arg(&arg));
                CommandLine::Shell(line)
            }
        }
    }

    /// Add multiple arguments.
    pub fn args<I, S>(self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        args.into_iter().fold(self, |cmd, arg| cmd.arg(arg))
    }

    /// The program token, if this is an argument-vector command.
    pub fn program(&self) -> Option<&str> {
        match self {
            CommandLine::Args(args) => args.first().map(String::as_str),
            CommandLine::Shell(_) => None,
        }
    }

    /// Render as a single command line, quoting tokens that need it.
    pub fn to_command_line(&self) -> String {
        match self {
            CommandLine::Shell(line) => line.clone(),
            CommandLine::Args(args) => args
                .iter()
                .map(|a| quote_arg(a))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_command_line())
    }
}

/// Quote one argument using the MSVC runtime parsing rules.
///
/// Backslashes are literal unless they precede a double quote, in which case
/// they are doubled and the quote is escaped.
fn quote_arg(arg: &str) -> String {
    let needs_quotes = arg.is_empty() || arg.contains([' ', '\t']);
    let mut out = String::with_capacity(arg.len() + 2);
    if needs_quotes {
        out.push('"');
    }

    let mut backslashes = 0usize;
    for c in arg.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                out.extend(std::iter::repeat('\\').take(backslashes * 2 + 1));
                out.push('"');
                backslashes = 0;
            }
            _ => {
                out.extend(std::iter::repeat('\\').take(backslashes));
                out.push(c);
                backslashes = 0;
            }
        }
    }

    if needs_quotes {
        // Trailing backslashes would escape the closing quote
        out.extend(std::iter::repeat('\\').take(backslashes * 2));
        out.push('"');
    } else {
        out.extend(std::iter::repeat('\\').take(backslashes));
    }
    out
}
