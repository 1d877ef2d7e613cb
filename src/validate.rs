//! The per-edit validation entry point.
//!
//! One call runs the whole pipeline for an edited file: path filter, skip
//! flags, cooldown, directory lock, discovery, parallel execution, release,
//! cooldown stamp. Every state that is not a real lint/test failure resolves
//! to "pass" so the calling session is never blocked by the hook itself.

use crate::cancel::CancelToken;
use crate::command::{OsProcesses, RealCommandRunner};
use crate::config::ValidatorConfig;
use crate::cooldown::CooldownTracker;
use crate::discovery::{CommandDiscoverer, CommandKind, Discovery};
use crate::error::Result;
use crate::executor::{CommandReport, ParallelExecutor, ValidationResult};
use crate::hook_logging::{EventLog, ValidateEvent};
use crate::lock::{DirectoryLock, FileLockManager};
use crate::paths::{normalize_dir, StateDir};
use crate::project::{find_project_root, should_skip_file};
use crate::skip::{SkipOverride, SkipRegistry};
use crate::store::JsonFileStore;
use crate::templates;
use crate::traits::{CommandRunner, SystemClock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Exit code: validation passed, skipped, or had nothing to do.
pub const EXIT_PASS: i32 = 0;

/// Exit code: validation failed; the message on stderr is shown to the assistant.
pub const EXIT_SHOW_MESSAGE: i32 = 2;

/// How a validation call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The edited file is in an ignored location or is a test/generated file.
    Filtered,
    /// Both lint and test are skipped for this project.
    Skipped,
    /// The project was validated too recently.
    CoolingDown,
    /// Another process is validating this project.
    Locked,
    /// No lint or test command could be found.
    NothingToValidate,
    /// Commands ran.
    Completed(ValidationResult),
}

impl Outcome {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Filtered => "filtered",
            Self::Skipped => "skipped",
            Self::CoolingDown => "cooling_down",
            Self::Locked => "locked",
            Self::NothingToValidate => "nothing_to_validate",
            Self::Completed(_) => "completed",
        }
    }

    /// Whether this outcome lets the session continue silently.
    #[must_use]
    pub const fn passed(&self) -> bool {
        match self {
            Self::Completed(result) => result.both_passed,
            _ => true,
        }
    }
}

/// Parameters for one validation.
#[derive(Debug, Clone, Copy)]
pub struct ValidationRequest<'a> {
    /// Project root; discovered from the edited file when `None`.
    pub project_root: Option<&'a Path>,
    /// The file that was just edited.
    pub edited_file: &'a Path,
    /// Per-call skip flags, merged with the registry.
    pub skip: SkipOverride,
    /// Per-command deadline.
    pub timeout: Duration,
    /// Minimum time between two runs for the same project.
    pub cooldown: Duration,
    /// Trips when the process is asked to stop.
    pub cancel: &'a CancelToken,
}

/// The assembled validation pipeline.
pub struct Validator {
    skips: SkipRegistry,
    cooldowns: CooldownTracker,
    lock: Box<dyn DirectoryLock>,
    discovery: Box<dyn CommandDiscoverer>,
    executor: ParallelExecutor,
    events: Option<EventLog>,
}

impl Validator {
    /// Assemble a pipeline from its parts.
    pub fn new(
        skips: SkipRegistry,
        cooldowns: CooldownTracker,
        lock: impl DirectoryLock + 'static,
        discovery: impl CommandDiscoverer + 'static,
        executor: ParallelExecutor,
    ) -> Self {
        Self {
            skips,
            cooldowns,
            lock: Box::new(lock),
            discovery: Box::new(discovery),
            executor,
            events: None,
        }
    }

    /// The production pipeline: JSON stores and lock files under `state`,
    /// real subprocesses, wall clock.
    #[must_use]
    pub fn from_config(config: &ValidatorConfig, state: &StateDir) -> Self {
        let runner: Arc<dyn CommandRunner> = Arc::new(RealCommandRunner::new());
        let clock = Arc::new(SystemClock);
        let lock = FileLockManager::new(state.locks(), clock.clone(), Arc::new(OsProcesses))
            .with_stale_after(config.lock_stale_after());
        let validator = Self::new(
            SkipRegistry::new(JsonFileStore::new(state.skip_registry())),
            CooldownTracker::new(JsonFileStore::new(state.cooldowns()), clock),
            lock,
            Discovery::new(runner.clone()).with_overrides(config.overrides()),
            ParallelExecutor::new(runner),
        );
        if config.debug {
            validator.with_event_log(EventLog::new(state.events_log()))
        } else {
            validator
        }
    }

    /// Append every validation to `log`.
    #[must_use]
    pub fn with_event_log(mut self, log: EventLog) -> Self {
        self.events = Some(log);
        self
    }

    /// The skip registry this pipeline consults.
    #[must_use]
    pub const fn skips(&self) -> &SkipRegistry {
        &self.skips
    }

    /// The cooldown tracker this pipeline consults.
    #[must_use]
    pub const fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    /// Run the pipeline for one edited file.
    ///
    /// # Errors
    ///
    /// Returns an error if a persistent store (skip registry, cooldowns,
    /// lock directory) cannot be read or written before the commands run.
    /// A cooldown stamp that cannot be written afterwards is only logged.
    pub fn evaluate(&self, request: &ValidationRequest<'_>) -> Result<Outcome> {
        let file = absolute(request.edited_file)?;
        let file_dir = file.parent().map_or_else(|| file.clone(), Path::to_path_buf);
        let root = match request.project_root {
            Some(root) => normalize_dir(root)?,
            None => normalize_dir(&find_project_root(&file_dir))?,
        };
        let file_dir = normalize_dir(&file_dir)?;
        let file = file.file_name().map_or_else(|| file.clone(), |name| file_dir.join(name));

        if should_skip_file(&file, &root) {
            tracing::debug!(file = %file.display(), "filtered");
            return Ok(Outcome::Filtered);
        }

        let skip = self.skips.get(&root)?.merge(request.skip);
        if skip.skips_all() {
            tracing::debug!(root = %root.display(), "lint and test skipped");
            return Ok(Outcome::Skipped);
        }

        if !self.cooldowns.should_run(&root, request.cooldown)? {
            tracing::debug!(root = %root.display(), "cooling down");
            return Ok(Outcome::CoolingDown);
        }

        let Some(guard) = self.lock.try_acquire(&root)? else {
            tracing::debug!(root = %root.display(), "another validation is running");
            return Ok(Outcome::Locked);
        };

        let lint = if skip.skip_lint {
            None
        } else {
            self.discovery.discover(&file_dir, &root, CommandKind::Lint)?
        };
        let test = if skip.skip_test {
            None
        } else {
            self.discovery.discover(&file_dir, &root, CommandKind::Test)?
        };
        if lint.is_none() && test.is_none() {
            return Ok(Outcome::NothingToValidate);
        }

        let result =
            self.executor.run(lint.as_ref(), test.as_ref(), request.timeout, request.cancel);
        guard.release();

        if request.cancel.is_cancelled() {
            tracing::debug!(root = %root.display(), "cancelled, not recording cooldown");
        } else if let Err(e) = self.cooldowns.record_run(&root) {
            tracing::warn!(root = %root.display(), error = %e, "cooldown stamp not recorded");
        }
        Ok(Outcome::Completed(result))
    }

    fn log_event(&self, request: &ValidationRequest<'_>, outcome: &Outcome, elapsed: Duration) {
        if let Some(log) = &self.events {
            log.record(&ValidateEvent::new(
                request.project_root,
                request.edited_file,
                outcome.name(),
                outcome.passed(),
                elapsed,
            ));
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Validate an edited file, returning the exit code and stderr message.
///
/// Returns `(0, "")` when validation passes or there is nothing to do and
/// `(2, message)` when lint or test failed. A broken state store produces a
/// warning with exit code 0.
pub fn validate(
    validator: &Validator,
    project_root: Option<&Path>,
    edited_file: &Path,
    skip: SkipOverride,
    timeout_secs: u64,
    cooldown_secs: u64,
    cancel: &CancelToken,
) -> (i32, String) {
    let request = ValidationRequest {
        project_root,
        edited_file,
        skip,
        timeout: Duration::from_secs(timeout_secs),
        cooldown: Duration::from_secs(cooldown_secs),
        cancel,
    };
    let started = Instant::now();

    match validator.evaluate(&request) {
        Ok(outcome) => {
            validator.log_event(&request, &outcome, started.elapsed());
            match outcome {
                Outcome::Completed(result) if !result.both_passed => {
                    (EXIT_SHOW_MESSAGE, failure_message(&result))
                }
                _ => (EXIT_PASS, String::new()),
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "validation state unavailable");
            (EXIT_PASS, format!("edit-validator: warning: {e}"))
        }
    }
}

/// Render the message shown to the assistant for a failed validation.
#[must_use]
pub fn failure_message(result: &ValidationResult) -> String {
    let lint = result.lint.as_ref().filter(|r| !r.passed());
    let test = result.test.as_ref().filter(|r| !r.passed());

    let mut context = tera::Context::new();
    insert_report(&mut context, "lint", lint);
    insert_report(&mut context, "test", test);
    let template = match (lint, test) {
        (Some(_), Some(_)) => templates::BOTH_FAILED,
        (Some(_), None) => templates::LINT_FAILED,
        _ => templates::TEST_FAILED,
    };

    templates::render(template, &context).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "falling back to plain failure message");
        [lint, test]
            .into_iter()
            .flatten()
            .map(|r| format!("{} failed in {}\n{}", r.command, r.working_dir.display(), r.output))
            .collect::<Vec<_>>()
            .join("\n\n")
    })
}

fn insert_report(context: &mut tera::Context, prefix: &str, report: Option<&CommandReport>) {
    let (dir, command, output) = report.map_or_else(
        || (String::new(), String::new(), String::new()),
        |r| (r.working_dir.display().to_string(), r.command.clone(), r.output.trim().to_string()),
    );
    context.insert(format!("{prefix}_dir"), &dir);
    context.insert(format!("{prefix}_command"), &command);
    context.insert(format!("{prefix}_output"), &output);
}
