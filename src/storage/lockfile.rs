//! Data directory lock
//!
//! Sled locks its database directory itself, but a second `bluepath` on the
//! same `storage.data_dir` only finds out deep inside `sled::open`. The lock
//! file turns that into an early error naming the holder's PID.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

const LOCK_FILE_NAME: &str = ".bluepath.lock";

#[derive(Debug, Error)]
pub enum LockError {
    #[error("data directory {dir:?} is in use by PID {pid}; remove {path:?} if that process is gone")]
    Held { dir: PathBuf, pid: u32, path: PathBuf },

    #[error("lock file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Exclusive claim on a data directory, released on drop.
#[derive(Debug)]
pub struct ProcessLock {
    path: PathBuf,
}

impl ProcessLock {
    /// Create `data_dir` if needed and claim it.
    ///
    /// The lock file is created with `create_new`, so two processes racing
    /// for the same directory cannot both win. A file left by a dead process
    /// (or one that does not hold a PID) is cleared and the claim retried once.
    pub fn acquire<P: AsRef<Path>>(data_dir: P) -> Result<Self, LockError> {
        let dir = data_dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| LockError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join(LOCK_FILE_NAME);
        let io_err = |path: &Path, source| LockError::Io {
            path: path.to_path_buf(),
            source,
        };

        for _ in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    let pid = std::process::id();
                    writeln!(file, "{pid}").map_err(|e| io_err(&path, e))?;
                    tracing::debug!(pid, path = %path.display(), "Data directory locked");
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if let Some(pid) = live_holder(&path) {
                        return Err(LockError::Held {
                            dir: dir.to_path_buf(),
                            pid,
                            path,
                        });
                    }
                    tracing::info!(path = %path.display(), "Clearing stale lock file");
                    match fs::remove_file(&path) {
                        Ok(()) => {}
                        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                        Err(e) => return Err(io_err(&path, e)),
                    }
                }
                Err(e) => return Err(io_err(&path, e)),
            }
        }

        Err(io_err(
            &path,
            io::Error::new(io::ErrorKind::AlreadyExists, "lock file recreated by another process"),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove lock file");
        }
    }
}

/// PID recorded in `path` when it belongs to another running BluePath process.
fn live_holder(path: &Path) -> Option<u32> {
    let pid: u32 = fs::read_to_string(path).ok()?.trim().parse().ok()?;
    (pid != std::process::id() && is_bluepath_process(pid)).then_some(pid)
}

#[cfg(unix)]
fn is_bluepath_process(pid: u32) -> bool {
    fs::read_to_string(format!("/proc/{pid}/cmdline"))
        .map(|cmdline| ["bluepath", "voyage-sim"].iter().any(|name| cmdline.contains(name)))
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_bluepath_process(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn lock_file(dir: &Path) -> PathBuf {
        dir.join(LOCK_FILE_NAME)
    }

    #[test]
    fn claim_records_our_pid() {
        let dir = tempdir().unwrap();
        let lock = ProcessLock::acquire(dir.path().join("nested")).unwrap();
        let pid: u32 = fs::read_to_string(lock.path()).unwrap().trim().parse().unwrap();
        assert_eq!(pid, std::process::id());
    }

    #[test]
    fn drop_releases_the_directory() {
        let dir = tempdir().unwrap();
        drop(ProcessLock::acquire(dir.path()).unwrap());
        assert!(!lock_file(dir.path()).exists());
        assert!(ProcessLock::acquire(dir.path()).is_ok());
    }

    #[test]
    fn dead_holder_is_cleared() {
        let dir = tempdir().unwrap();
        fs::write(lock_file(dir.path()), "999999999\n").unwrap();
        let lock = ProcessLock::acquire(dir.path()).unwrap();
        assert_eq!(
            fs::read_to_string(lock.path()).unwrap().trim(),
            std::process::id().to_string()
        );
    }

    #[test]
    fn unreadable_lock_is_replaced() {
        let dir = tempdir().unwrap();
        fs::write(lock_file(dir.path()), "not a pid").unwrap();
        assert!(ProcessLock::acquire(dir.path()).is_ok());
    }

    #[test]
    fn held_error_names_the_pid() {
        let err = LockError::Held {
            dir: PathBuf::from("/data"),
            pid: 4242,
            path: PathBuf::from("/data/.bluepath.lock"),
        };
        assert!(err.to_string().contains("4242"));
    }
}
