//! Workspace directory layout and file writes.
//!
//! ```text
//! <workspace>/
//! ├── techmd-references.xml                 # Reference index
//! ├── <digest>-<record_type>-techmd.xml     # One file per unique record
//! └── .techmd.lock                          # Advisory lock (CLI only)
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::StorageError;
use crate::identifier::ContentIdentifier;

/// Name of the reference index file
pub const REFERENCES_FILE: &str = "techmd-references.xml";

/// Name of the advisory lock file
pub const LOCK_FILE: &str = ".techmd.lock";

/// Suffix shared by all record files
pub const RECORD_SUFFIX: &str = "-techmd.xml";

/// A directory holding record files and one reference index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn references_path(&self) -> PathBuf {
        self.root.join(REFERENCES_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    pub fn record_path(&self, id: &ContentIdentifier) -> PathBuf {
        self.root.join(id.file_name())
    }

    /// Create the workspace directory if it does not exist yet
    pub async fn ensure_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::io("create workspace", &self.root, e))
    }

    /// Whether a record file for `id` is already present
    pub async fn has_record(&self, id: &ContentIdentifier) -> Result<bool, StorageError> {
        let path = self.record_path(id);
        fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::io("check record", path, e))
    }

    /// Replace `path` with `contents` so readers never see a partial file.
    ///
    /// The data goes to a temporary file in the workspace directory, is
    /// synced, then renamed over the target.
    pub async fn write_atomic(&self, path: &Path, contents: Vec<u8>) -> Result<(), StorageError> {
        let dir = self.root.clone();
        let target = path.to_path_buf();

        tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            let mut tmp = tempfile::Builder::new()
                .prefix(".techmd-")
                .suffix(".tmp")
                .tempfile_in(&dir)
                .map_err(|e| StorageError::io("create temporary file in", &dir, e))?;

            tmp.write_all(&contents)
                .map_err(|e| StorageError::io("write", tmp.path(), e))?;
            tmp.as_file()
                .sync_all()
                .map_err(|e| StorageError::io("sync", tmp.path(), e))?;
            tmp.persist(&target)
                .map_err(|e| StorageError::io("replace", &target, e.error))?;

            Ok(())
        })
        .await
        .map_err(|e| StorageError::io("write", path, std::io::Error::other(e)))?
    }

    /// File names of all record files, sorted
    pub fn list_records(&self) -> Result<Vec<String>, StorageError> {
        let pattern = format!(
            "{}/*{}",
            glob::Pattern::escape(&self.root.to_string_lossy()),
            RECORD_SUFFIX
        );
        let paths = glob::glob(&pattern).map_err(|e| {
            StorageError::io(
                "list",
                &self.root,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()),
            )
        })?;

        let mut names = Vec::new();
        for entry in paths {
            let path = entry.map_err(|e| {
                let path = e.path().to_path_buf();
                StorageError::io("read", path, e.into_error())
            })?;
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();

        Ok(names)
    }
}
