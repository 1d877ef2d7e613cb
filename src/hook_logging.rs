//! Diagnostics and the validation event log.
//!
//! Diagnostics go through `tracing`. When debug mode is on, every validation
//! is also appended as a JSONL line to `<state dir>/validate-events.jsonl`
//! so hook behavior can be inspected after the fact.

use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Install the stderr `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise debug mode logs at `debug` and
/// everything else at `warn`.
#[cfg(feature = "cli")]
pub fn init_tracing(debug: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
}

/// One line of the event log.
#[derive(Debug, Clone, Serialize)]
pub struct ValidateEvent<'a> {
    /// When the validation finished (RFC 3339).
    pub timestamp: String,
    /// Project root the validation ran against.
    pub project_root: Option<&'a Path>,
    /// The edited file.
    pub file: &'a Path,
    /// Terminal state, e.g. `completed` or `cooling_down`.
    pub outcome: &'a str,
    /// Whether the validation passed.
    pub passed: bool,
    /// Wall-clock time spent.
    pub duration_ms: u64,
}

impl<'a> ValidateEvent<'a> {
    /// Build an event stamped with the current time.
    pub fn new(
        project_root: Option<&'a Path>,
        file: &'a Path,
        outcome: &'a str,
        passed: bool,
        duration: Duration,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            project_root,
            file,
            outcome,
            passed,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Append-only JSONL log of validations.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    /// Log to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `event`. Errors are ignored; logging never breaks validation.
    pub fn record(&self, event: &ValidateEvent<'_>) {
        if let Some(parent) = self.path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return;
            }
        }
        let Ok(line) = serde_json::to_string(event) else {
            return;
        };
        let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&self.path) else {
            return;
        };
        let _ = writeln!(file, "{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_log_lines(path: &Path) -> Vec<serde_json::Value> {
        if !path.exists() {
            return vec![];
        }
        let content = std::fs::read_to_string(path).unwrap();
        content
            .lines()
            .filter(|l| !l.is_empty())
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_record_appends_lines() {
        let dir = TempDir::new().unwrap();
        let log = EventLog::new(dir.path().join("state/validate-events.jsonl"));
        let file = Path::new("/p/main.go");

        log.record(&ValidateEvent::new(
            Some(Path::new("/p")),
            file,
            "completed",
            false,
            Duration::from_millis(1500),
        ));
        log.record(&ValidateEvent::new(None, file, "filtered", true, Duration::ZERO));

        let lines = read_log_lines(log.path());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["project_root"], "/p");
        assert_eq!(lines[0]["outcome"], "completed");
        assert_eq!(lines[0]["passed"], false);
        assert_eq!(lines[0]["duration_ms"], 1500);
        assert!(lines[0]["timestamp"].is_string());
        assert!(lines[1]["project_root"].is_null());
    }

    #[test]
    fn test_record_unwritable_is_silent() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a dir").unwrap();
        let log = EventLog::new(blocker.join("events.jsonl"));

        log.record(&ValidateEvent::new(None, Path::new("/x"), "skipped", true, Duration::ZERO));
        assert!(!log.path().exists());
    }
}
