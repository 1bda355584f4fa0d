use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A single argument token of a toolchain invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandArg {
    /// Rendered verbatim; wrapped in quotes only when it contains whitespace
    Plain(String),
    /// Always rendered in double quotes (paths, filter expressions)
    Quoted(String),
}

impl CommandArg {
    /// The value handed to the OS as one argv element
    pub fn value(&self) -> &str {
        match self {
            CommandArg::Plain(v) | CommandArg::Quoted(v) => v,
        }
    }
}

impl fmt::Display for CommandArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandArg::Plain(v) if v.is_empty() || v.contains(char::is_whitespace) => {
                write!(f, "\"{}\"", v)
            }
            CommandArg::Plain(v) => f.write_str(v),
            CommandArg::Quoted(v) => write!(f, "\"{}\"", v),
        }
    }
}

/// Fully-assembled description of one external process invocation.
///
/// Built with the consuming `arg`/`quoted`/`cwd` methods and never changed
/// once handed to a runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    program: String,
    args: Vec<CommandArg>,
    cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(CommandArg::Plain(arg.into()));
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args
            .extend(args.into_iter().map(|a| CommandArg::Plain(a.into())));
        self
    }

    pub fn quoted(mut self, arg: impl Into<String>) -> Self {
        self.args.push(CommandArg::Quoted(arg.into()));
        self
    }

    pub fn cwd(mut self, dir: Option<PathBuf>) -> Self {
        self.cwd = dir;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn tokens(&self) -> &[CommandArg] {
        &self.args
    }

    /// Argument values as passed to the OS, without display quoting
    pub fn argv(&self) -> Vec<&str> {
        self.args.iter().map(CommandArg::value).collect()
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// The argument string, e.g. `clean "E:\src\App\App.csproj" --configuration Release`
    pub fn arguments(&self) -> String {
        self.args
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Program followed by the argument string
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.arguments())
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Outcome of one process run that started and exited.
///
/// A non-zero `exit_code` is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Metadata pattern-extracted from a project file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub target_framework: Option<String>,
    pub target_frameworks: Option<String>,
    pub output_type: Option<String>,
    pub uses_wpf: bool,
    pub uses_windows_forms: bool,
}
