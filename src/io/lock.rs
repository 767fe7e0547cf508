use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// How long a save waits for another session to finish its own
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

const RETRY_MIN: Duration = Duration::from_millis(5);
const RETRY_MAX: Duration = Duration::from_millis(100);

/// Error type for the state-file lock
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not open lock file {path}: {source}")]
    CreateError { path: PathBuf, source: io::Error },
    #[error("timed out waiting for {path}; another tree-copy session is saving")]
    Timeout { path: PathBuf },
}

/// Exclusive advisory lock held for one read-modify-write of the state file.
///
/// Released when dropped. The lock file is left in place: removing it would
/// let a waiter lock an inode nobody else can see.
pub struct FileLock {
    _file: File,
    path: PathBuf,
}

impl FileLock {
    /// Take the lock once, without waiting. `Ok(None)` means it is held
    /// elsewhere.
    pub fn try_acquire(lock_path: &Path) -> Result<Option<Self>, LockError> {
        let file = open_lock_file(lock_path)?;
        if flock_exclusive_nonblocking(&file) {
            Ok(Some(FileLock {
                _file: file,
                path: lock_path.to_path_buf(),
            }))
        } else {
            Ok(None)
        }
    }

    /// Wait up to `timeout` for the lock, backing off between attempts
    pub fn acquire(lock_path: &Path, timeout: Duration) -> Result<Self, LockError> {
        let deadline = Instant::now() + timeout;
        let mut pause = RETRY_MIN;
        loop {
            if let Some(lock) = Self::try_acquire(lock_path)? {
                return Ok(lock);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(LockError::Timeout {
                    path: lock_path.to_path_buf(),
                });
            }
            thread::sleep(pause.min(deadline - now));
            pause = (pause * 2).min(RETRY_MAX);
        }
    }

    pub fn acquire_default(lock_path: &Path) -> Result<Self, LockError> {
        Self::acquire(lock_path, DEFAULT_LOCK_TIMEOUT)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_lock_file(path: &Path) -> Result<File, LockError> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|e| LockError::CreateError {
            path: path.to_path_buf(),
            source: e,
        })
}

#[cfg(unix)]
fn flock_exclusive_nonblocking(file: &File) -> bool {
    use std::os::unix::io::AsRawFd;
    unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) == 0 }
}

#[cfg(not(unix))]
fn flock_exclusive_nonblocking(_file: &File) -> bool {
    true
}
