//! Core traits for testability and abstraction.

use crate::cancel::CancelToken;
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Output from a command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// The exit code of the command (-1 when killed by a signal).
    pub exit_code: i32,
    /// The stdout output.
    pub stdout: String,
    /// The stderr output.
    pub stderr: String,
    /// Whether the command was killed because its timeout expired.
    pub timed_out: bool,
    /// Whether the command was killed because the caller cancelled.
    pub cancelled: bool,
}

impl CommandOutput {
    /// Check if the command succeeded (exit code 0, not killed).
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out && !self.cancelled
    }

    /// Get combined stdout and stderr.
    #[must_use]
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// A single subprocess launch request.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    /// The program to run.
    pub program: &'a str,
    /// The arguments to pass.
    pub args: &'a [String],
    /// The working directory.
    pub dir: &'a Path,
    /// Kill the command once this much time has elapsed.
    pub timeout: Option<Duration>,
    /// Kill the command as soon as this token is cancelled.
    pub cancel: Option<&'a CancelToken>,
}

impl<'a> Invocation<'a> {
    /// Create an invocation with no timeout and no cancellation.
    #[must_use]
    pub const fn new(program: &'a str, args: &'a [String], dir: &'a Path) -> Self {
        Self { program, args, dir, timeout: None, cancel: None }
    }

    /// Set the timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the cancellation token.
    #[must_use]
    pub const fn with_cancel(mut self, cancel: &'a CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Trait for running external commands.
///
/// This trait abstracts command execution for testability. Implementations
/// must be shareable across threads because lint and test run concurrently.
pub trait CommandRunner: Send + Sync {
    /// Run a command and wait for it to finish, time out, or be cancelled.
    ///
    /// A command that times out or is cancelled is not an error: it returns
    /// `Ok` with `timed_out` / `cancelled` set.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned or waited on.
    fn run(&self, invocation: &Invocation<'_>) -> Result<CommandOutput>;

    /// Resolve a program on PATH.
    fn resolve(&self, program: &str) -> Option<PathBuf>;

    /// Check if a program is available in PATH.
    fn is_available(&self, program: &str) -> bool {
        self.resolve(program).is_some()
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Access to the OS process table.
pub trait Processes: Send + Sync {
    /// The PID of the current process.
    fn current_pid(&self) -> u32;

    /// Whether a process with the given PID exists.
    fn is_alive(&self, pid: u32) -> bool;
}
