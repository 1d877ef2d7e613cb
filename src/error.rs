//! Error types for `edit_validator`.

use std::path::PathBuf;

/// Errors that can occur in the validation engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON serialization error occurred.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML parsing error occurred.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A persisted state file exists but cannot be parsed.
    ///
    /// User-set state is never silently discarded, so this is surfaced
    /// instead of being treated as an empty table.
    #[error("Corrupt state file {path}: {source}")]
    CorruptStore {
        /// The file that failed to parse.
        path: PathBuf,
        /// The parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Renaming a temp file over its target failed.
    #[error("Failed to persist {path}: {source}")]
    Persist {
        /// The target path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A path could not be turned into an absolute directory key.
    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),

    /// A config file exists but cannot be parsed.
    #[error("Invalid config file {path}: {message}")]
    InvalidConfig {
        /// The config file path.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// A command timed out.
    #[error("Command '{command}' timed out after {timeout_secs}s")]
    CommandTimeout {
        /// The command that was run.
        command: String,
        /// The timeout in seconds.
        timeout_secs: u64,
    },

    /// A template error occurred.
    #[error("Template error: {0}")]
    Template(String),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
