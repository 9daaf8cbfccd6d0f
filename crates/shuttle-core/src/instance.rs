//! Single-worker guard: an exclusive `flock` on a file next to the job database.
//!
//! The lock is tied to the open file description, so it is released when the
//! guard drops or the process dies. A crashed worker never leaves a stale lock.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("another shuttle worker already owns this job database (lock {})", .0.display())]
    AlreadyRunning(PathBuf),

    #[error("lock {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Held for as long as this process runs the worker.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
    _file: File,
}

impl InstanceLock {
    /// Lock file guarding the database at `db_path`.
    pub fn path_for(db_path: &Path) -> PathBuf {
        let mut name = db_path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Take the lock without waiting. Fails with [`InstanceError::AlreadyRunning`]
    /// while any other holder, in this process or another, keeps it.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self, InstanceError> {
        let path = path.as_ref().to_path_buf();
        let io_err = |source| InstanceError::Io {
            path: path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(io_err)?;

        let r = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if r != 0 {
            let err = io::Error::last_os_error();
            return Err(match err.raw_os_error() {
                Some(code) if code == libc::EWOULDBLOCK => InstanceError::AlreadyRunning(path),
                _ => io_err(err),
            });
        }

        // Holder's pid, for whoever finds the file while debugging.
        file.set_len(0).map_err(io_err)?;
        writeln!(file, "{}", std::process::id()).map_err(io_err)?;
        Ok(Self { path, _file: file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_holder_is_refused_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = InstanceLock::path_for(&dir.path().join("jobs.db"));
        assert_eq!(path, dir.path().join("jobs.db.lock"));

        let first = InstanceLock::acquire(&path).unwrap();
        assert!(matches!(
            InstanceLock::acquire(&path).unwrap_err(),
            InstanceError::AlreadyRunning(p) if p == path
        ));
        let pid = std::fs::read_to_string(first.path()).unwrap();
        assert_eq!(pid.trim(), std::process::id().to_string());

        drop(first);
        InstanceLock::acquire(&path).unwrap();
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = InstanceLock::acquire(dir.path().join("nope/jobs.db.lock")).unwrap_err();
        assert!(matches!(err, InstanceError::Io { .. }));
    }
}
