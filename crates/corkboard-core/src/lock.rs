//! Advisory file locks serializing one relationship's apply pass.
//!
//! The state machine already gates double approval (only one caller wins
//! the pending → queued transition), but the background job environment
//! may re-deliver work. The per-relationship lock file makes "at most one
//! mover per relationship" hold even then. Locks are acquired per attempt
//! and released before any backoff sleep.

use crate::error::ErrorCode;
use fs2::FileExt;
use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

/// Advisory lock errors.
#[derive(Debug)]
pub enum LockError {
    Timeout { path: PathBuf, waited: Duration },
    IoError(io::Error),
}

impl From<io::Error> for LockError {
    fn from(err: io::Error) -> Self {
        Self::IoError(err)
    }
}

impl LockError {
    /// Machine-readable code associated with this lock error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Timeout { .. } => ErrorCode::LockContention,
            Self::IoError(_) => ErrorCode::InternalUnexpected,
        }
    }
}

impl std::fmt::Display for LockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout { path, waited } => {
                write!(
                    f,
                    "{}: lock timed out after {:?} at {}",
                    self.code().code(),
                    waited,
                    path.display()
                )
            }
            Self::IoError(err) => write!(f, "{}: {}", self.code().code(), err),
        }
    }
}

impl std::error::Error for LockError {}

/// RAII guard: exclusive advisory lock on one relationship's apply pass.
#[derive(Debug)]
pub struct ProcessingLock {
    file: File,
    path: PathBuf,
}

impl ProcessingLock {
    /// Acquire the lock for `relationship_id`, polling until `timeout`.
    ///
    /// # Errors
    ///
    /// [`LockError::Timeout`] when another holder outlasts the timeout,
    /// [`LockError::IoError`] when the lock file cannot be created.
    pub fn acquire(
        lock_dir: &Path,
        relationship_id: i64,
        timeout: Duration,
    ) -> Result<Self, LockError> {
        fs::create_dir_all(lock_dir)?;
        let path = lock_dir.join(format!("relationship-{relationship_id}.lock"));

        let start = Instant::now();
        loop {
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&path)?;

            if file.try_lock_exclusive().is_ok() {
                return Ok(Self { file, path });
            }

            if start.elapsed() >= timeout {
                return Err(LockError::Timeout {
                    path,
                    waited: start.elapsed(),
                });
            }

            thread::sleep(Duration::from_millis(10));
        }
    }

    /// Explicitly release the lock. Release also happens on drop.
    pub fn release(self) {
        let _ = self.file.unlock();
    }

    /// The lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProcessingLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
