//! On-disk layout of a store directory.
//!
//! ```text
//! <store>/
//! ├─ LOCK            # advisory lock, one process at a time
//! ├─ commits.log     # framed commit log
//! └─ commits.jsonl   # optional commit history sink
//! ```

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const LOG_FILE: &str = "commits.log";

/// An opened, exclusively locked store directory.
///
/// The lock is held until the value is dropped, so only one engine per
/// directory can apply batches at a time.
#[derive(Debug)]
pub struct StoreDir {
    path: PathBuf,
    _lock_file: File,
}

impl StoreDir {
    /// Opens (and optionally creates) a store directory and locks it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the directory is missing and
    /// `create_if_missing` is false or the path is not a directory,
    /// `StoreLocked` if another process holds the lock, or an I/O error.
    pub fn open(path: &Path, create_if_missing: bool) -> CoreResult<Self> {
        if !path.exists() {
            if !create_if_missing {
                return Err(CoreError::invalid_argument(format!(
                    "store directory does not exist: {}",
                    path.display()
                )));
            }
            fs::create_dir_all(path)?;
        }
        if !path.is_dir() {
            return Err(CoreError::invalid_argument(format!(
                "store path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::StoreLocked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// The store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the commit log.
    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        self.path.join(LOG_FILE)
    }

    /// Path of a file inside the directory, e.g. the history sink.
    #[must_use]
    pub fn file_path(&self, name: &Path) -> PathBuf {
        self.path.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_directory() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("store");

        let dir = StoreDir::open(&path, true).unwrap();
        assert!(path.is_dir());
        assert_eq!(dir.path(), path);
        assert_eq!(dir.log_path(), path.join("commits.log"));
        assert_eq!(
            dir.file_path(Path::new("commits.jsonl")),
            path.join("commits.jsonl")
        );
    }

    #[test]
    fn missing_directory_without_create_fails() {
        let temp = tempdir().unwrap();
        let result = StoreDir::open(&temp.path().join("absent"), false);
        assert!(matches!(result, Err(CoreError::InvalidArgument { .. })));
    }

    #[test]
    fn second_open_is_locked_out() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("store");

        let _first = StoreDir::open(&path, true).unwrap();
        assert!(matches!(
            StoreDir::open(&path, true),
            Err(CoreError::StoreLocked)
        ));
    }

    #[test]
    fn lock_is_released_on_drop() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("store");

        drop(StoreDir::open(&path, true).unwrap());
        assert!(StoreDir::open(&path, true).is_ok());
    }
}
