//! # Data Directory Locking
//!
//! Prevents two portal processes from writing the same data directory.
//! Uses `fs2` for cross-platform file locking (flock on Unix, LockFile on
//! Windows). The lock is released on drop.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from data directory locking.
#[derive(Debug, Error)]
pub enum LockError {
    /// Lock file could not be created
    #[error("Failed to create lock file: {0}")]
    CreateFailed(#[source] io::Error),
    /// Directory is already locked by another process
    #[error("Data directory already in use ({}), holder pid {:?}", .path.display(), .pid)]
    AlreadyLocked { pid: Option<u32>, path: PathBuf },
    /// Failed to write PID to lock file
    #[error("Failed to write PID to lock file: {0}")]
    WriteFailed(#[source] io::Error),
}

/// Exclusive lock on a data directory.
pub struct DataDirLock {
    file: File,
    path: PathBuf,
    pid: u32,
}

impl DataDirLock {
    /// Lock file name
    const LOCK_FILE: &'static str = ".lock";

    /// Acquire an exclusive lock on `data_dir`, creating the directory if
    /// needed. Fails immediately if another process holds it.
    pub fn acquire(data_dir: &Path) -> Result<Self, LockError> {
        std::fs::create_dir_all(data_dir).map_err(LockError::CreateFailed)?;
        let path = data_dir.join(Self::LOCK_FILE);

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(LockError::CreateFailed)?;

        if file.try_lock_exclusive().is_err() {
            let mut content = String::new();
            let pid = file
                .read_to_string(&mut content)
                .ok()
                .and_then(|_| content.trim().parse().ok());
            return Err(LockError::AlreadyLocked { pid, path });
        }

        let pid = std::process::id();
        file.set_len(0).map_err(LockError::WriteFailed)?;
        file.seek(SeekFrom::Start(0)).map_err(LockError::WriteFailed)?;
        writeln!(file, "{pid}").map_err(LockError::WriteFailed)?;
        file.sync_all().map_err(LockError::WriteFailed)?;

        tracing::debug!(path = %path.display(), pid, "Data directory locked");

        Ok(Self { file, path, pid })
    }

    /// PID of the process holding the lock
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Path to the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DataDirLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_contains_pid() {
        let dir = tempfile::tempdir().unwrap();

        let lock = DataDirLock::acquire(dir.path()).expect("Should acquire lock");
        let content = std::fs::read_to_string(lock.path()).unwrap();
        assert_eq!(content.trim().parse::<u32>().unwrap(), std::process::id());
        assert_eq!(lock.pid(), std::process::id());
    }

    #[test]
    fn test_double_lock_fails() {
        let dir = tempfile::tempdir().unwrap();

        let _lock = DataDirLock::acquire(dir.path()).expect("First lock should succeed");
        let result = DataDirLock::acquire(dir.path());
        assert!(matches!(result, Err(LockError::AlreadyLocked { .. })));
    }

    #[test]
    fn test_lock_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();

        let lock = DataDirLock::acquire(dir.path()).unwrap();
        let path = lock.path().to_path_buf();
        drop(lock);
        assert!(!path.exists());

        assert!(DataDirLock::acquire(dir.path()).is_ok());
    }
}
