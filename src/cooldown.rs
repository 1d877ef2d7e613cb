//! Per-directory "last validated at" stamps.

use crate::error::Result;
use crate::paths::dir_key;
use crate::store::Store;
use crate::traits::Clock;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Tracks when each directory was last validated.
pub struct CooldownTracker {
    store: Box<dyn Store<DateTime<Utc>>>,
    clock: Arc<dyn Clock>,
}

impl CooldownTracker {
    /// Create a tracker over `store`, reading time from `clock`.
    pub fn new(store: impl Store<DateTime<Utc>> + 'static, clock: Arc<dyn Clock>) -> Self {
        Self { store: Box::new(store), clock }
    }

    /// Whether `dir` is outside its cooldown window.
    ///
    /// A zero window always runs. A stamp in the future (the clock moved
    /// backwards) counts as expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the cooldown store cannot be read.
    pub fn should_run(&self, dir: &Path, window: Duration) -> Result<bool> {
        if window.is_zero() {
            return Ok(true);
        }
        let Some(last) = self.last_run(dir)? else {
            return Ok(true);
        };
        Ok((self.clock.now() - last).to_std().map_or(true, |elapsed| elapsed >= window))
    }

    /// Stamp `dir` with the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the cooldown store cannot be read or written.
    pub fn record_run(&self, dir: &Path) -> Result<()> {
        self.store.set(&dir_key(dir)?, self.clock.now())
    }

    /// When `dir` was last stamped.
    ///
    /// # Errors
    ///
    /// Returns an error if the cooldown store cannot be read.
    pub fn last_run(&self, dir: &Path) -> Result<Option<DateTime<Utc>>> {
        self.store.get(&dir_key(dir)?)
    }

    /// Forget the stamp for `dir`, reporting whether there was one.
    ///
    /// # Errors
    ///
    /// Returns an error if the cooldown store cannot be read or written.
    pub fn clear(&self, dir: &Path) -> Result<bool> {
        self.store.delete(&dir_key(dir)?)
    }
}
