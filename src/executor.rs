//! Concurrent execution of the lint and test commands.

use crate::cancel::CancelToken;
use crate::discovery::DiscoveredCommand;
use crate::error::Error;
use crate::traits::{CommandRunner, Invocation};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::ScopedJoinHandle;
use std::time::{Duration, Instant};

/// Outcome of one executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReport {
    /// The command line that ran.
    pub command: String,
    /// Directory it ran in.
    pub working_dir: PathBuf,
    /// Exit code; -1 if it was killed or could not be spawned.
    pub exit_code: i32,
    /// Combined stdout and stderr of a failing command; empty on success.
    pub output: String,
    /// Whether the command was killed at its deadline.
    pub timed_out: bool,
    /// Wall-clock time spent.
    pub duration: Duration,
}

impl CommandReport {
    /// Whether the command exited zero within its deadline.
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

/// Aggregate outcome of a validation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// True iff every command that ran passed.
    pub both_passed: bool,
    /// Lint report, if lint ran.
    pub lint: Option<CommandReport>,
    /// Test report, if test ran.
    pub test: Option<CommandReport>,
    /// Wall-clock time for the whole run.
    pub duration: Duration,
}

impl ValidationResult {
    /// Lint failure output, empty if lint passed or did not run.
    #[must_use]
    pub fn lint_output(&self) -> &str {
        self.lint.as_ref().map_or("", |r| r.output.as_str())
    }

    /// Test failure output, empty if test passed or did not run.
    #[must_use]
    pub fn test_output(&self) -> &str {
        self.test.as_ref().map_or("", |r| r.output.as_str())
    }

    /// Lint exit code, 0 if lint did not run.
    #[must_use]
    pub fn lint_exit_code(&self) -> i32 {
        self.lint.as_ref().map_or(0, |r| r.exit_code)
    }

    /// Test exit code, 0 if test did not run.
    #[must_use]
    pub fn test_exit_code(&self) -> i32 {
        self.test.as_ref().map_or(0, |r| r.exit_code)
    }
}

/// Runs lint and test side by side, each under its own deadline.
pub struct ParallelExecutor {
    runner: Arc<dyn CommandRunner>,
}

impl ParallelExecutor {
    /// Execute commands through `runner`.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Run whichever of `lint` and `test` are present, concurrently.
    ///
    /// A failure of one never aborts the other.
    pub fn run(
        &self,
        lint: Option<&DiscoveredCommand>,
        test: Option<&DiscoveredCommand>,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> ValidationResult {
        let started = Instant::now();
        let (lint, test) = std::thread::scope(|scope| {
            let lint = lint.map(|c| (c, scope.spawn(move || self.run_one(c, timeout, cancel))));
            let test = test.map(|c| (c, scope.spawn(move || self.run_one(c, timeout, cancel))));
            (
                lint.map(|(c, handle)| join_report(c, handle, started)),
                test.map(|(c, handle)| join_report(c, handle, started)),
            )
        });

        let both_passed = [&lint, &test].into_iter().flatten().all(CommandReport::passed);
        ValidationResult { both_passed, lint, test, duration: started.elapsed() }
    }

    fn run_one(
        &self,
        command: &DiscoveredCommand,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> CommandReport {
        let line = command.to_string();
        let started = Instant::now();
        let invocation = Invocation::new(&command.executable, &command.args, &command.working_dir)
            .with_timeout(timeout)
            .with_cancel(cancel);
        tracing::debug!(kind = %command.kind, command = %line, "running");

        let report = match self.runner.run(&invocation) {
            Ok(output) if output.timed_out => {
                let mut message =
                    Error::CommandTimeout { command: line.clone(), timeout_secs: timeout.as_secs() }
                        .to_string();
                let partial = output.combined_output();
                if !partial.trim().is_empty() {
                    message.push('\n');
                    message.push_str(&partial);
                }
                CommandReport {
                    command: line,
                    working_dir: command.working_dir.clone(),
                    exit_code: -1,
                    output: message,
                    timed_out: true,
                    duration: started.elapsed(),
                }
            }
            Ok(output) if output.cancelled => CommandReport {
                command: line,
                working_dir: command.working_dir.clone(),
                exit_code: -1,
                output: "cancelled".to_string(),
                timed_out: false,
                duration: started.elapsed(),
            },
            Ok(output) => CommandReport {
                command: line,
                working_dir: command.working_dir.clone(),
                exit_code: output.exit_code,
                output: if output.success() { String::new() } else { output.combined_output() },
                timed_out: false,
                duration: started.elapsed(),
            },
            Err(e) => CommandReport {
                command: line,
                working_dir: command.working_dir.clone(),
                exit_code: -1,
                output: format!("failed to start: {e}"),
                timed_out: false,
                duration: started.elapsed(),
            },
        };
        tracing::debug!(
            kind = %command.kind,
            exit_code = report.exit_code,
            timed_out = report.timed_out,
            elapsed_ms = u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
            "finished"
        );
        report
    }
}

fn join_report(
    command: &DiscoveredCommand,
    handle: ScopedJoinHandle<'_, CommandReport>,
    started: Instant,
) -> CommandReport {
    handle.join().unwrap_or_else(|_| CommandReport {
        command: command.to_string(),
        working_dir: command.working_dir.clone(),
        exit_code: -1,
        output: "command supervisor panicked".to_string(),
        timed_out: false,
        duration: started.elapsed(),
    })
}
