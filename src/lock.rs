//! Cross-process, per-directory lock files.
//!
//! A lock is a small JSON file stamped with the holder's PID and acquisition
//! time. It is created with no-clobber semantics, so exactly one process can
//! win a race. A lock whose holder is gone, that has outlived the staleness
//! bound, or that cannot be parsed is reclaimed.

use crate::error::{Error, Result};
use crate::paths::{lock_file_name, normalize_dir};
use crate::traits::{Clock, Processes};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default age after which a lock is considered abandoned.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(600);

/// Contents of a lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// PID of the holder.
    pub pid: u32,
    /// When the holder took the lock.
    pub acquired_at: DateTime<Utc>,
}

/// Held lock. Releases on drop.
pub struct LockGuard {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl LockGuard {
    /// Create a guard that runs `release` exactly once.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self { release: Some(Box::new(release)) }
    }

    /// Release the lock now.
    pub fn release(mut self) {
        self.run_release();
    }

    fn run_release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.run_release();
    }
}

impl fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard").field("held", &self.release.is_some()).finish()
    }
}

/// Non-blocking mutual exclusion keyed by directory.
pub trait DirectoryLock: Send + Sync {
    /// Take the lock for `dir` if nobody live holds it.
    ///
    /// Returns `Ok(None)` immediately when the lock is held.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock directory cannot be written.
    fn try_acquire(&self, dir: &Path) -> Result<Option<LockGuard>>;
}

/// [`DirectoryLock`] backed by PID-stamped files in one directory.
pub struct FileLockManager {
    lock_dir: PathBuf,
    clock: Arc<dyn Clock>,
    processes: Arc<dyn Processes>,
    stale_after: Duration,
}

impl FileLockManager {
    /// Store lock files in `lock_dir`.
    pub fn new(
        lock_dir: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
        processes: Arc<dyn Processes>,
    ) -> Self {
        Self { lock_dir: lock_dir.into(), clock, processes, stale_after: DEFAULT_STALE_AFTER }
    }

    /// Treat locks older than `stale_after` as abandoned even if the PID is alive.
    #[must_use]
    pub const fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Path of the lock file guarding `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` cannot be normalized.
    pub fn lock_path(&self, dir: &Path) -> Result<PathBuf> {
        Ok(self.lock_dir.join(lock_file_name(&normalize_dir(dir)?)))
    }

    /// Who holds the lock for `dir`, if anyone. `Some(None)` means the lock
    /// file exists but is unreadable.
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` cannot be normalized.
    pub fn holder(&self, dir: &Path) -> Result<Option<Option<LockRecord>>> {
        Ok(read_lock(&self.lock_path(dir)?))
    }

    /// Write `record` to `path` unless a lock file is already there.
    fn create(&self, path: &Path, record: &LockRecord) -> Result<bool> {
        std::fs::create_dir_all(&self.lock_dir)?;
        let mut temp = tempfile::NamedTempFile::new_in(&self.lock_dir)?;
        serde_json::to_writer(temp.as_file_mut(), record)?;
        temp.as_file_mut().write_all(b"\n")?;
        temp.as_file().sync_all()?;
        match temp.persist_noclobber(path) {
            Ok(_) => Ok(true),
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(Error::Persist { path: path.to_path_buf(), source: e.error }),
        }
    }

    fn is_stale(&self, observed: Option<&LockRecord>) -> bool {
        let Some(record) = observed else {
            return true;
        };
        if !self.processes.is_alive(record.pid) {
            return true;
        }
        (self.clock.now() - record.acquired_at).to_std().is_ok_and(|age| age > self.stale_after)
    }

    /// Remove a stale lock file, provided it still holds what was observed.
    ///
    /// The file is first renamed aside so that a lock freshly created by
    /// another process in the meantime can be put back untouched.
    fn reclaim(&self, path: &Path, observed: Option<&LockRecord>) -> Result<()> {
        let aside = path.with_extension(format!("stale-{}", self.processes.current_pid()));
        match std::fs::rename(path, &aside) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        }
        let moved = read_lock(&aside).flatten();
        if moved.as_ref() != observed {
            let _ = std::fs::hard_link(&aside, path);
        }
        let _ = std::fs::remove_file(&aside);
        Ok(())
    }
}

impl DirectoryLock for FileLockManager {
    fn try_acquire(&self, dir: &Path) -> Result<Option<LockGuard>> {
        let path = self.lock_path(dir)?;

        for attempt in 0..2 {
            let record =
                LockRecord { pid: self.processes.current_pid(), acquired_at: self.clock.now() };
            if self.create(&path, &record)? {
                tracing::debug!(lock = %path.display(), "acquired");
                return Ok(Some(release_guard(path, record)));
            }

            // Released between our create and read: just retry.
            let Some(observed) = read_lock(&path) else {
                continue;
            };
            if !self.is_stale(observed.as_ref()) {
                tracing::debug!(lock = %path.display(), holder = ?observed, "held");
                return Ok(None);
            }
            if attempt == 0 {
                tracing::debug!(lock = %path.display(), holder = ?observed, "reclaiming stale");
                self.reclaim(&path, observed.as_ref())?;
            }
        }
        Ok(None)
    }
}

/// Read a lock file: `None` if absent, `Some(None)` if unparsable.
fn read_lock(path: &Path) -> Option<Option<LockRecord>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Some(serde_json::from_str(&content).ok()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(_) => Some(None),
    }
}

fn release_guard(path: PathBuf, record: LockRecord) -> LockGuard {
    LockGuard::new(move || {
        if read_lock(&path).flatten().as_ref() != Some(&record) {
            tracing::debug!(lock = %path.display(), "no longer ours, leaving in place");
            return;
        }
        if let Err(e) = std::fs::remove_file(&path) {
            tracing::warn!(lock = %path.display(), error = %e, "failed to release lock");
        }
    })
}
