//! Child-process invocation for the bisection driver.
//!
//! Exactly one child runs at a time: each call spawns a single process,
//! fully consumes its output, and waits for termination before returning.
//! Two modes:
//! - Captured: stdout/stderr are piped and returned; a non-zero exit is
//!   reported through the exit code, never as an error.
//! - Checked: the child inherits the caller's terminal and a non-zero exit
//!   is an error.
//!
//! Commands are structured argument vectors; nothing is routed through a
//! shell.

use crate::errors::RunnerError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// A snapshot of the invoking process environment.
///
/// Captured once per session and forwarded unmodified to every spawned
/// child, so a mid-run change to the driver's own environment can never
/// leak into later iterations.
#[derive(Debug, Clone)]
pub struct EnvSnapshot {
    vars: Vec<(OsString, OsString)>,
}

impl EnvSnapshot {
    /// Capture the full environment of the current process.
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars_os().collect(),
        }
    }

    fn apply(&self, command: &mut Command) {
        command.env_clear();
        command.envs(self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str())));
    }
}

/// One external command: program, argument vector, working directory.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    cwd: PathBuf,
}

impl CommandSpec {
    /// Create a spec for `program` running in `cwd`.
    pub fn new(program: impl Into<String>, cwd: impl AsRef<Path>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.as_ref().to_path_buf(),
        }
    }

    /// Append a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a sequence of arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Reconstructed command line, for messages and error payloads only.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Outcome of one captured invocation. Immutable once produced.
#[derive(Debug, Clone)]
pub struct StageResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl StageResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run a command with stdout and stderr captured.
///
/// Never fails on a non-zero exit; callers inspect `StageResult::exit_code`.
/// Fails only when the child cannot be spawned or waited on.
pub async fn run_captured(
    spec: &CommandSpec,
    env: &EnvSnapshot,
) -> Result<StageResult, RunnerError> {
    let command_line = spec.display();
    debug!(command = %command_line, cwd = %spec.cwd.display(), "spawning captured command");

    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .current_dir(&spec.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    env.apply(&mut command);

    let child = command.spawn().map_err(|source| RunnerError::SpawnFailed {
        command: command_line.clone(),
        source,
    })?;

    let output = child
        .wait_with_output()
        .await
        .map_err(|source| RunnerError::SpawnFailed {
            command: command_line.clone(),
            source,
        })?;

    let exit_code = output.status.code().unwrap_or(-1);
    debug!(command = %command_line, exit_code, "captured command finished");

    Ok(StageResult {
        exit_code,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Run a command with the caller's terminal inherited.
///
/// Used where success is required: a non-zero exit is a `CommandFailed`
/// error carrying the exit code and the reconstructed command line.
pub async fn run_checked(spec: &CommandSpec, env: &EnvSnapshot) -> Result<(), RunnerError> {
    let command_line = spec.display();
    debug!(command = %command_line, cwd = %spec.cwd.display(), "spawning checked command");

    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .current_dir(&spec.cwd)
        .stdin(Stdio::null());
    env.apply(&mut command);

    let status = command
        .status()
        .await
        .map_err(|source| RunnerError::SpawnFailed {
            command: command_line.clone(),
            source,
        })?;

    let exit_code = status.code().unwrap_or(-1);
    debug!(command = %command_line, exit_code, "checked command finished");

    if status.success() {
        Ok(())
    } else {
        Err(RunnerError::CommandFailed {
            command: command_line,
            exit_code,
        })
    }
}
