//! Persistent per-directory lint/test skip flags.

use crate::error::Result;
use crate::paths::dir_key;
use crate::store::Store;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Skip flags stored for one directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipEntry {
    /// Never run the lint command here.
    #[serde(default)]
    pub skip_lint: bool,
    /// Never run the test command here.
    #[serde(default)]
    pub skip_test: bool,
}

impl SkipEntry {
    /// Whether neither kind is skipped.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        !self.skip_lint && !self.skip_test
    }

    /// Whether both kinds are skipped.
    #[must_use]
    pub const fn skips_all(self) -> bool {
        self.skip_lint && self.skip_test
    }

    /// Combine with a per-call override; a kind skipped by either is skipped.
    #[must_use]
    pub const fn merge(self, other: SkipOverride) -> Self {
        Self {
            skip_lint: self.skip_lint || other.skip_lint,
            skip_test: self.skip_test || other.skip_test,
        }
    }

    fn with(self, kind: SkipKind, value: bool) -> Self {
        match kind {
            SkipKind::Lint => Self { skip_lint: value, ..self },
            SkipKind::Test => Self { skip_test: value, ..self },
            SkipKind::All => Self { skip_lint: value, skip_test: value },
        }
    }
}

impl fmt::Display for SkipEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.skip_lint, self.skip_test) {
            (true, true) => write!(f, "lint, test"),
            (true, false) => write!(f, "lint"),
            (false, true) => write!(f, "test"),
            (false, false) => write!(f, "nothing"),
        }
    }
}

/// Transient skip flags for a single validation call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipOverride {
    /// Skip lint for this call.
    pub skip_lint: bool,
    /// Skip test for this call.
    pub skip_test: bool,
}

/// Which command(s) a skip or unskip applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipKind {
    /// The lint command.
    Lint,
    /// The test command.
    Test,
    /// Both commands.
    All,
}

impl FromStr for SkipKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "lint" => Ok(Self::Lint),
            "test" => Ok(Self::Test),
            "all" => Ok(Self::All),
            other => Err(format!("unknown skip kind '{other}' (expected lint, test or all)")),
        }
    }
}

impl fmt::Display for SkipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lint => "lint",
            Self::Test => "test",
            Self::All => "all",
        })
    }
}

/// Directory-keyed skip flags over a [`Store`].
pub struct SkipRegistry {
    store: Box<dyn Store<SkipEntry>>,
}

impl SkipRegistry {
    /// Create a registry over `store`.
    pub fn new(store: impl Store<SkipEntry> + 'static) -> Self {
        Self { store: Box::new(store) }
    }

    /// Flags for `dir`; all-false when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be read.
    pub fn get(&self, dir: &Path) -> Result<SkipEntry> {
        Ok(self.store.get(&dir_key(dir)?)?.unwrap_or_default())
    }

    /// Replace the flags for `dir`. An all-false entry removes the row.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be read or written.
    pub fn set(&self, dir: &Path, entry: SkipEntry) -> Result<()> {
        let key = dir_key(dir)?;
        if entry.is_empty() {
            self.store.delete(&key)?;
            Ok(())
        } else {
            self.store.set(&key, entry)
        }
    }

    /// Remove all flags for `dir`, reporting whether any existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be read or written.
    pub fn delete(&self, dir: &Path) -> Result<bool> {
        self.store.delete(&dir_key(dir)?)
    }

    /// Turn on skipping of `kind` for `dir`, returning the new flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be read or written.
    pub fn add(&self, dir: &Path, kind: SkipKind) -> Result<SkipEntry> {
        let entry = self.get(dir)?.with(kind, true);
        self.set(dir, entry)?;
        Ok(entry)
    }

    /// Turn off skipping of `kind` for `dir`, returning the new flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be read or written.
    pub fn remove(&self, dir: &Path, kind: SkipKind) -> Result<SkipEntry> {
        let entry = self.get(dir)?.with(kind, false);
        self.set(dir, entry)?;
        Ok(entry)
    }

    /// Every directory with flags, sorted by path.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be read.
    pub fn list(&self) -> Result<Vec<(String, SkipEntry)>> {
        Ok(self.store.entries()?.into_iter().filter(|(_, e)| !e.is_empty()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::JsonFileStore;
    use crate::testing::MemoryStore;
    use tempfile::TempDir;

    #[test]
    fn test_get_defaults_to_nothing_skipped() {
        let registry = SkipRegistry::new(MemoryStore::new());
        assert_eq!(registry.get(Path::new("/p")).unwrap(), SkipEntry::default());
    }

    #[test]
    fn test_add_and_remove() {
        let registry = SkipRegistry::new(MemoryStore::new());
        let dir = Path::new("/p");

        let entry = registry.add(dir, SkipKind::Lint).unwrap();
        assert_eq!(entry, SkipEntry { skip_lint: true, skip_test: false });

        let entry = registry.add(dir, SkipKind::Test).unwrap();
        assert!(entry.skips_all());

        let entry = registry.remove(dir, SkipKind::Lint).unwrap();
        assert_eq!(entry, SkipEntry { skip_lint: false, skip_test: true });
    }

    #[test]
    fn test_all_false_deletes_row() {
        let registry = SkipRegistry::new(MemoryStore::new());
        let dir = Path::new("/p");
        registry.add(dir, SkipKind::All).unwrap();
        registry.remove(dir, SkipKind::All).unwrap();
        assert!(registry.list().unwrap().is_empty());
        assert!(!registry.delete(dir).unwrap());
    }

    #[test]
    fn test_relative_and_absolute_share_entry() {
        let registry = SkipRegistry::new(MemoryStore::new());
        let cwd = std::env::current_dir().unwrap();
        registry.add(Path::new("./src/../src"), SkipKind::Test).unwrap();
        assert!(registry.get(&cwd.join("src")).unwrap().skip_test);
    }

    #[test]
    fn test_list_sorted() {
        let registry = SkipRegistry::new(MemoryStore::new());
        registry.add(Path::new("/z"), SkipKind::Lint).unwrap();
        registry.add(Path::new("/a"), SkipKind::Test).unwrap();
        let dirs: Vec<_> = registry.list().unwrap().into_iter().map(|(d, _)| d).collect();
        assert_eq!(dirs, vec!["/a".to_string(), "/z".to_string()]);
    }

    #[test]
    fn test_persists_across_instances() {
        let state = TempDir::new().unwrap();
        let path = state.path().join("skip-registry.json");
        let project = TempDir::new().unwrap();

        SkipRegistry::new(JsonFileStore::new(&path)).add(project.path(), SkipKind::Lint).unwrap();

        let reopened = SkipRegistry::new(JsonFileStore::new(&path));
        assert!(reopened.get(project.path()).unwrap().skip_lint);
    }

    #[test]
    fn test_file_format() {
        let state = TempDir::new().unwrap();
        let path = state.path().join("skip-registry.json");
        std::fs::write(&path, r#"{"/proj": {"skip_lint": true, "skip_test": false}}"#).unwrap();
        let registry = SkipRegistry::new(JsonFileStore::new(&path));
        assert_eq!(
            registry.get(Path::new("/proj")).unwrap(),
            SkipEntry { skip_lint: true, skip_test: false }
        );
    }

    #[test]
    fn test_corrupt_registry_is_error() {
        let state = TempDir::new().unwrap();
        let path = state.path().join("skip-registry.json");
        std::fs::write(&path, "[1, 2").unwrap();
        let registry = SkipRegistry::new(JsonFileStore::new(&path));
        assert!(matches!(registry.get(Path::new("/p")), Err(Error::CorruptStore { .. })));
    }

    #[test]
    fn test_merge_override() {
        let stored = SkipEntry { skip_lint: true, skip_test: false };
        let merged = stored.merge(SkipOverride { skip_lint: false, skip_test: true });
        assert!(merged.skips_all());
    }

    #[test]
    fn test_skip_kind_parse() {
        assert_eq!("lint".parse::<SkipKind>().unwrap(), SkipKind::Lint);
        assert_eq!("all".parse::<SkipKind>().unwrap(), SkipKind::All);
        assert!("format".parse::<SkipKind>().is_err());
    }

    #[test]
    fn test_entry_display() {
        assert_eq!(SkipEntry { skip_lint: true, skip_test: true }.to_string(), "lint, test");
        assert_eq!(SkipEntry::default().to_string(), "nothing");
    }
}
