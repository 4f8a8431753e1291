//! Per-document write locks
//!
//! Writers take an exclusive `fs2` lock on `.aidocs/locks/<name>.lock` for the
//! duration of a mutation. Different names use different lock files, so
//! writers to different documents never wait on each other.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use fs2::FileExt;
use tracing::{debug, warn};

use crate::domain::{DocError, DocName};

const RETRY_DELAY: Duration = Duration::from_millis(250);

/// Exclusive lock on one document name, released on drop
#[derive(Debug)]
pub struct NameLock {
    file: File,
    path: PathBuf,
}

impl NameLock {
    /// Takes the lock, retrying once before failing with [`DocError::Busy`]
    pub fn acquire(locks_dir: &Path, name: &DocName) -> Result<Self> {
        fs::create_dir_all(locks_dir).with_context(|| {
            format!("Failed to create locks directory: {}", locks_dir.display())
        })?;

        let path = locks_dir.join(format!("{}.lock", name));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))?;

        if file.try_lock_exclusive().is_err() {
            warn!(name = %name, "doc is locked by another writer, retrying once");
            thread::sleep(RETRY_DELAY);

            if file.try_lock_exclusive().is_err() {
                return Err(DocError::Busy(name.to_string()).into());
            }
        }

        debug!(name = %name, "acquired doc lock");
        Ok(Self { file, path })
    }

    /// Removes the lock file while still holding the lock, then releases it
    ///
    /// Used once the name no longer exists. A writer already waiting on the
    /// old file still gets it after release.
    pub fn remove(self) {
        if let Err(e) = fs::remove_file(&self.path) {
            debug!(path = %self.path.display(), error = %e, "could not remove lock file");
        }
    }
}

impl Drop for NameLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
