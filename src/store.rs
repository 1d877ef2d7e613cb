//! Persistent key/value tables backed by a single JSON file.
//!
//! Every write replaces the whole file through a temp file in the same
//! directory followed by a rename, so a reader never sees a half-written
//! table and a crash mid-write leaves the previous version intact.
//!
//! Concurrent writers from different processes are not serialized: the last
//! rename wins and an update made in between can be lost. Both tables that
//! use this (skip flags, cooldown stamps) tolerate that.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// A string-keyed table of values.
pub trait Store<V>: Send + Sync {
    /// Look up one key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read or is corrupt.
    fn get(&self, key: &str) -> Result<Option<V>>;

    /// Insert or replace one key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read or written.
    fn set(&self, key: &str, value: V) -> Result<()>;

    /// Remove one key, reporting whether it was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read or written.
    fn delete(&self, key: &str) -> Result<bool>;

    /// All entries, sorted by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read or is corrupt.
    fn entries(&self) -> Result<BTreeMap<String, V>>;
}

/// A [`Store`] persisted as one pretty-printed JSON object.
#[derive(Debug)]
pub struct JsonFileStore<V> {
    path: PathBuf,
    _value: PhantomData<fn() -> V>,
}

impl<V> JsonFileStore<V> {
    /// Create a store backed by `path`. Nothing is touched until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), _value: PhantomData }
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<V: Serialize + DeserializeOwned> JsonFileStore<V> {
    fn load(&self) -> Result<BTreeMap<String, V>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .map_err(|source| Error::CorruptStore { path: self.path.clone(), source })
    }

    fn save(&self, table: &BTreeMap<String, V>) -> Result<()> {
        let mut bytes = serde_json::to_vec_pretty(table)?;
        bytes.push(b'\n');
        write_atomic(&self.path, &bytes)
    }
}

impl<V: Serialize + DeserializeOwned> Store<V> for JsonFileStore<V> {
    fn get(&self, key: &str) -> Result<Option<V>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: V) -> Result<()> {
        let mut table = self.load()?;
        table.insert(key.to_string(), value);
        self.save(&table)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut table = self.load()?;
        if table.remove(key).is_none() {
            return Ok(false);
        }
        self.save(&table)?;
        Ok(true)
    }

    fn entries(&self) -> Result<BTreeMap<String, V>> {
        self.load()
    }
}

/// Replace `path` with `bytes` via a temp file in the same directory.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created, or the temp
/// file cannot be written or renamed into place.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().ok_or_else(|| Error::InvalidPath(path.to_path_buf()))?;
    std::fs::create_dir_all(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.as_file_mut().write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Persist { path: path.to_path_buf(), source: e.error })?;
    Ok(())
}
