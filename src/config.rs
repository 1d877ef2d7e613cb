//! Configuration for the validation hook.
//!
//! Settings come from `<state dir>/config.yaml` when present, then from
//! `EDIT_VALIDATOR_*` environment variables. Command-line flags, handled by
//! the CLI, override both.

use crate::discovery::CommandOverrides;
use crate::error::{Error, Result};
use crate::paths::StateDir;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default per-command timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default minimum time between two validations of the same project.
pub const DEFAULT_COOLDOWN_SECS: u64 = 30;

/// Default age after which a lock is reclaimed even if its holder is alive.
pub const DEFAULT_LOCK_STALE_SECS: u64 = 600;

/// Environment variable overriding the timeout.
pub const ENV_TIMEOUT: &str = "EDIT_VALIDATOR_TIMEOUT_SECONDS";
/// Environment variable overriding the cooldown.
pub const ENV_COOLDOWN: &str = "EDIT_VALIDATOR_COOLDOWN_SECONDS";
/// Environment variable enabling debug output (`1` or `true`).
pub const ENV_DEBUG: &str = "EDIT_VALIDATOR_DEBUG";
/// Environment variable replacing the lint command.
pub const ENV_LINT_COMMAND: &str = "EDIT_VALIDATOR_LINT_COMMAND";
/// Environment variable replacing the test command.
pub const ENV_TEST_COMMAND: &str = "EDIT_VALIDATOR_TEST_COMMAND";

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

const fn default_cooldown_secs() -> u64 {
    DEFAULT_COOLDOWN_SECS
}

const fn default_lock_stale_secs() -> u64 {
    DEFAULT_LOCK_STALE_SECS
}

/// Validation hook settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Per-command timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Cooldown window in seconds; 0 disables it.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Lock age in seconds after which it is reclaimed.
    #[serde(default = "default_lock_stale_secs")]
    pub lock_stale_secs: u64,

    /// Verbose diagnostics on stderr plus the JSONL event log.
    #[serde(default)]
    pub debug: bool,

    /// Shell command used instead of lint discovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lint_command: Option<String>,

    /// Shell command used instead of test discovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_command: Option<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            lock_stale_secs: DEFAULT_LOCK_STALE_SECS,
            debug: false,
            lint_command: None,
            test_command: None,
        }
    }
}

impl ValidatorConfig {
    /// Load the config file at `path`, returning None if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Some(Self::default()));
        }
        let config = serde_yaml::from_str(&content).map_err(|e| Error::InvalidConfig {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Some(config))
    }

    /// Save the config to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        crate::store::write_atomic(path, content.as_bytes())
    }

    /// File settings from `state`, then environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but is invalid.
    pub fn load(state: &StateDir) -> Result<Self> {
        let mut config = Self::load_from(&state.config())?.unwrap_or_default();
        config.apply_env_from(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `EDIT_VALIDATOR_*` overrides read through `lookup`.
    ///
    /// Values that fail to parse are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let seconds = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        if let Some(timeout) = seconds(ENV_TIMEOUT).filter(|t| *t > 0) {
            self.timeout_secs = timeout;
        }
        if let Some(cooldown) = seconds(ENV_COOLDOWN) {
            self.cooldown_secs = cooldown;
        }
        if let Some(debug) = lookup(ENV_DEBUG) {
            self.debug = matches!(debug.trim(), "1" | "true" | "yes");
        }
        if let Some(command) = lookup(ENV_LINT_COMMAND).filter(|c| !c.trim().is_empty()) {
            self.lint_command = Some(command);
        }
        if let Some(command) = lookup(ENV_TEST_COMMAND).filter(|c| !c.trim().is_empty()) {
            self.test_command = Some(command);
        }
    }

    /// The lint/test command overrides for discovery.
    #[must_use]
    pub fn overrides(&self) -> CommandOverrides {
        CommandOverrides { lint: self.lint_command.clone(), test: self.test_command.clone() }
    }

    /// Effective lock staleness bound: never less than twice the timeout,
    /// so a slow but live validation is not reclaimed mid-run.
    #[must_use]
    pub fn lock_stale_after(&self) -> Duration {
        Duration::from_secs(self.lock_stale_secs.max(self.timeout_secs.saturating_mul(2)))
    }
}
