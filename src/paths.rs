//! Path utilities for state storage locations and directory keys.
//!
//! All persistent state (skip registry, cooldown stamps, lock files, config
//! and the event log) lives under a single state directory. Directories are
//! keyed by their absolute, lexically cleaned path.

use crate::error::{Error, Result};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Component, Path, PathBuf};

/// Environment variable overriding the state directory.
pub const STATE_DIR_ENV: &str = "EDIT_VALIDATOR_HOME";

const STATE_DIR_NAME: &str = "edit-validator";

/// Skip registry filename.
pub const SKIP_REGISTRY_FILENAME: &str = "skip-registry.json";

/// Cooldown store filename.
pub const COOLDOWN_FILENAME: &str = "cooldowns.json";

/// Config filename.
pub const CONFIG_FILENAME: &str = "config.yaml";

/// Event log filename.
pub const EVENTS_FILENAME: &str = "validate-events.jsonl";

/// Resolve the state directory.
///
/// `$EDIT_VALIDATOR_HOME` if set and non-empty, else the platform config
/// directory, else the temp directory.
#[must_use]
pub fn state_dir() -> PathBuf {
    if let Some(home) = std::env::var_os(STATE_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(home);
    }
    dirs::config_dir().unwrap_or_else(std::env::temp_dir).join(STATE_DIR_NAME)
}

/// The layout of files inside a state directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDir {
    root: PathBuf,
}

impl StateDir {
    /// Use `root` as the state directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The state directory resolved from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(state_dir())
    }

    /// The state directory itself.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the skip registry file.
    #[must_use]
    pub fn skip_registry(&self) -> PathBuf {
        self.root.join(SKIP_REGISTRY_FILENAME)
    }

    /// Path of the cooldown store file.
    #[must_use]
    pub fn cooldowns(&self) -> PathBuf {
        self.root.join(COOLDOWN_FILENAME)
    }

    /// Directory holding per-project lock files.
    #[must_use]
    pub fn locks(&self) -> PathBuf {
        self.root.join("locks")
    }

    /// Path of the config file.
    #[must_use]
    pub fn config(&self) -> PathBuf {
        self.root.join(CONFIG_FILENAME)
    }

    /// Path of the JSONL event log.
    #[must_use]
    pub fn events_log(&self) -> PathBuf {
        self.root.join(EVENTS_FILENAME)
    }
}

/// Turn `path` into an absolute, lexically cleaned directory key.
///
/// Relative paths are resolved against the current directory, `.` and `..`
/// components are folded, and symlinks are resolved when the path exists.
///
/// # Errors
///
/// Returns an error if `path` is relative and the current directory
/// cannot be determined, or if `path` is empty.
pub fn normalize_dir(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(Error::InvalidPath(path.to_path_buf()));
    }
    let absolute =
        if path.is_absolute() { path.to_path_buf() } else { std::env::current_dir()?.join(path) };
    let cleaned = clean(&absolute);
    Ok(cleaned.canonicalize().unwrap_or(cleaned))
}

/// The store key for a directory: its normalized path as a string.
///
/// # Errors
///
/// Returns an error if the path cannot be normalized or is not valid UTF-8.
pub fn dir_key(path: &Path) -> Result<String> {
    let normalized = normalize_dir(path)?;
    normalized.to_str().map(str::to_string).ok_or(Error::InvalidPath(normalized))
}

/// Lexically clean an absolute path.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `/..` stays `/`
                if out.parent().is_some() {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// File name for the lock guarding `dir`.
///
/// Uses a readable prefix (last path component) plus a hash of the full path
/// so that similar paths never collide.
///
/// Format: `<dir-name>-<hash>.lock` e.g., `my-project-00a1b2c3d4e5f607.lock`
#[must_use]
pub fn lock_file_name(dir: &Path) -> String {
    let prefix = dir.file_name().and_then(|n| n.to_str()).unwrap_or("root");

    let prefix: String =
        prefix.chars().map(|c| if c.is_alphanumeric() { c } else { '-' }).collect();
    let prefix = prefix.trim_matches('-');
    let prefix = if prefix.is_empty() { "dir" } else { prefix };

    format!("{prefix}-{:016x}.lock", hash_path(dir))
}

/// Compute a stable hash of a path.
fn hash_path(path: &Path) -> u64 {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_state_dir_env_override() {
        let dir = tempfile::TempDir::new().unwrap();
        std::env::set_var(STATE_DIR_ENV, dir.path());
        assert_eq!(state_dir(), dir.path());
        std::env::remove_var(STATE_DIR_ENV);
    }

    #[test]
    #[serial]
    fn test_state_dir_default_name() {
        std::env::remove_var(STATE_DIR_ENV);
        assert!(state_dir().ends_with(STATE_DIR_NAME));
    }

    #[test]
    fn test_state_layout() {
        let state = StateDir::new("/state");
        assert_eq!(state.skip_registry(), Path::new("/state/skip-registry.json"));
        assert_eq!(state.cooldowns(), Path::new("/state/cooldowns.json"));
        assert_eq!(state.locks(), Path::new("/state/locks"));
        assert_eq!(state.config(), Path::new("/state/config.yaml"));
        assert_eq!(state.events_log(), Path::new("/state/validate-events.jsonl"));
    }

    #[test]
    fn test_normalize_folds_dots() {
        let key = normalize_dir(Path::new("/nonexistent-root/a/./b/../c")).unwrap();
        assert_eq!(key, Path::new("/nonexistent-root/a/c"));
    }

    #[test]
    fn test_normalize_relative_and_absolute_agree() {
        let cwd = std::env::current_dir().unwrap();
        let relative = normalize_dir(Path::new("./src")).unwrap();
        let absolute = normalize_dir(&cwd.join("src")).unwrap();
        assert_eq!(relative, absolute);
    }

    #[test]
    fn test_normalize_resolves_symlinks() {
        let dir = tempfile::TempDir::new().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir(&real).unwrap();
        #[cfg(unix)]
        {
            let link = dir.path().join("link");
            std::os::unix::fs::symlink(&real, &link).unwrap();
            assert_eq!(normalize_dir(&link).unwrap(), normalize_dir(&real).unwrap());
        }
    }

    #[test]
    fn test_normalize_empty_is_error() {
        assert!(matches!(normalize_dir(Path::new("")), Err(Error::InvalidPath(_))));
    }

    #[test]
    fn test_parent_of_root_is_root() {
        assert_eq!(clean(Path::new("/../..")), Path::new("/"));
    }

    #[test]
    fn test_lock_file_name_readable_prefix() {
        let name = lock_file_name(Path::new("/home/user/my project"));
        assert!(name.starts_with("my-project-"));
        assert!(name.ends_with(".lock"));
        assert!(!name.contains('/'));
    }

    #[test]
    fn test_lock_file_name_root() {
        assert!(lock_file_name(Path::new("/")).starts_with("root-"));
    }

    #[test]
    fn test_lock_file_name_no_collision_similar_paths() {
        let a = lock_file_name(Path::new("/home/user/project"));
        let b = lock_file_name(Path::new("/home/user-project"));
        assert_ne!(a, b);
    }

    proptest! {
        #[test]
        fn prop_clean_is_idempotent(parts in prop::collection::vec("[a-z]{1,4}|\\.|\\.\\.", 0..8)) {
            let path = PathBuf::from(format!("/{}", parts.join("/")));
            let once = clean(&path);
            prop_assert_eq!(clean(&once), once.clone());
            prop_assert!(once.is_absolute());
            prop_assert!(once
                .components()
                .all(|c| !matches!(c, Component::CurDir | Component::ParentDir)));
        }
    }
}
