//! Command Runner Abstraction
//!
//! Every external tool (apt-get, timeshift, flatpak, ...) is invoked through
//! [`CommandRunner`] so the pipeline can be exercised without touching the
//! system:
//!
//! - `SystemRunner` spawns real processes with a timeout
//! - `FakeRunner` replays scripted output and records each invocation

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use steward_common::StewardError;
use tracing::debug;

// ============================================================================
// Command description and output
// ============================================================================

/// A command line plus how it may be run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    /// Changes system state; suppressed in dry-run mode
    pub mutating: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            mutating: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn mutating(mut self) -> Self {
        self.mutating = true;
        self
    }

    /// Program and arguments joined by spaces
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn exit(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Last non-empty stderr line, falling back to stdout
    pub fn error_line(&self) -> String {
        let pick = |s: &str| {
            s.lines()
                .rev()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .map(str::to_string)
        };
        pick(&self.stderr)
            .or_else(|| pick(&self.stdout))
            .unwrap_or_else(|| format!("exit code {:?}", self.code))
    }

    /// Convert a non-zero exit into `CommandFailed`
    pub fn into_checked(self, spec: &CommandSpec) -> Result<Self, StewardError> {
        if self.success() {
            Ok(self)
        } else {
            Err(StewardError::CommandFailed {
                command: spec.display(),
                code: self.code,
                stderr: self.error_line(),
            })
        }
    }
}

// ============================================================================
// Runner trait
// ============================================================================

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion and capture output
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, StewardError>;

    /// Whether `program` is on PATH
    async fn exists(&self, program: &str) -> bool;
}

// ============================================================================
// System Runner (Production)
// ============================================================================

/// Tool output is parsed as English text; pin the C locale for children.
const CHILD_LOCALE: [(&str, &str); 2] = [("LC_ALL", "C"), ("LANG", "C")];

pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Process for `spec`. Entries in `spec.env` override the locale.
    fn command(spec: &CommandSpec) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(CHILD_LOCALE)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, StewardError> {
        debug!("Executing: {}", spec.display());

        let mut cmd = Self::command(spec);
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StewardError::ToolNotFound(spec.program.clone()));
            }
            Ok(Err(e)) => return Err(StewardError::Io(e)),
            Err(_) => {
                return Err(StewardError::Timeout(
                    spec.display(),
                    self.timeout.as_secs(),
                ));
            }
        };

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn exists(&self, program: &str) -> bool {
        tokio::process::Command::new("which")
            .arg(program)
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

// ============================================================================
// Fake Runner (Testing)
// ============================================================================

/// Scripted runner for deterministic tests.
///
/// Responses are keyed by [`CommandSpec::display`]. Unscripted commands
/// succeed with empty output; programs marked missing fail with
/// `ToolNotFound`.
///
/// ```rust,ignore
/// let fake = FakeRunner::new()
///     .respond("uname -r", CommandOutput::ok("6.1.0-13-amd64\n"))
///     .missing("timeshift");
/// ```
#[derive(Default)]
pub struct FakeRunner {
    responses: HashMap<String, CommandOutput>,
    missing: HashSet<String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, command: &str, output: CommandOutput) -> Self {
        self.responses.insert(command.to_string(), output);
        self
    }

    pub fn missing(mut self, program: &str) -> Self {
        self.missing.insert(program.to_string());
        self
    }

    /// Every command line run so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn was_called(&self, command: &str) -> bool {
        self.calls().iter().any(|c| c == command)
    }

    /// Whether any recorded call starts with `prefix`
    pub fn called_with_prefix(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, StewardError> {
        let line = spec.display();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(line.clone());
        }
        if self.missing.contains(&spec.program) {
            return Err(StewardError::ToolNotFound(spec.program.clone()));
        }
        Ok(self
            .responses
            .get(&line)
            .cloned()
            .unwrap_or_else(|| CommandOutput::ok("")))
    }

    async fn exists(&self, program: &str) -> bool {
        !self.missing.contains(program)
    }
}
