//! Advisory workspace lock.
//!
//! The store's index update is a read-merge-write cycle, so two processes
//! committing into the same workspace at once can lose entries. Callers that
//! may run concurrently hold this lock for the whole `commit`.
//!
//! The lock is an OS-level exclusive lock on `<workspace>/.techmd.lock` and is
//! released when the guard is dropped.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use tracing::debug;

use crate::error::StorageError;

use super::workspace::Workspace;

/// Default time to wait for another process to finish its commit
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Exclusive lock over one workspace
#[derive(Debug)]
pub struct WorkspaceLock {
    path: PathBuf,
    file: Option<File>,
}

impl WorkspaceLock {
    /// Acquire the lock, polling until `timeout` expires
    pub async fn acquire(workspace: &Workspace, timeout: Duration) -> Result<Self, StorageError> {
        workspace.ensure_dir().await?;

        let path = workspace.lock_path();
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(lock) = Self::try_acquire_at(&path)? {
                debug!(path = %path.display(), "Workspace lock acquired");
                return Ok(lock);
            }

            if Instant::now() >= deadline {
                return Err(StorageError::LockTimeout { path, timeout });
            }
            tokio::time::sleep(LOCK_POLL_INTERVAL).await;
        }
    }

    /// Try once; `Ok(None)` if another holder has it
    pub fn try_acquire(workspace: &Workspace) -> Result<Option<Self>, StorageError> {
        Self::try_acquire_at(&workspace.lock_path())
    }

    fn try_acquire_at(path: &Path) -> Result<Option<Self>, StorageError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| StorageError::io("open lock file", path, e))?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                path: path.to_path_buf(),
                file: Some(file),
            })),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(StorageError::io("lock", path, e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release before the guard goes out of scope
    pub fn release(&mut self) -> Result<(), StorageError> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| StorageError::io("unlock", &self.path, e))?;
        }
        Ok(())
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}
