//! Process-local single-instance lock.
//!
//! Same-host-only alternative to the UDP probe: an advisory exclusive lock
//! on a file derived from the instance identity. Cheaper than the network
//! exchange but blind to instances on other hosts, so the guard uses one
//! mechanism or the other, never both.

use std::fs::{File, OpenOptions};
use std::path::PathBuf;

use fs2::FileExt;
use tracing::{debug, warn};

use crate::InstanceId;

/// Named advisory lock keyed by instance identity.
///
/// The lock is held for the lifetime of this value (or until
/// [`NamedLock::release`]) and released on drop. Lock files live in the
/// system temp directory and are not removed after release; a stale file
/// without a holder does not block the next acquire.
pub struct NamedLock {
    path: PathBuf,
    file: Option<File>,
}

impl NamedLock {
    /// Creates an unheld lock for the given identity.
    #[must_use]
    pub fn new(identity: &InstanceId) -> Self {
        let file_name = format!("solo-{}.lock", sanitize(identity.as_str()));
        Self {
            path: std::env::temp_dir().join(file_name),
            file: None,
        }
    }

    /// Creates an unheld lock at an explicit path.
    #[must_use]
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    /// Attempts to take the lock without blocking.
    ///
    /// Returns true when this process now holds (or already held) the lock,
    /// i.e. it is the first instance. An I/O failure opening the lock file
    /// also returns true: wrongly allowing a duplicate is preferred to
    /// wrongly blocking a legitimate first launch.
    pub fn try_acquire(&mut self) -> bool {
        if self.file.is_some() {
            return true;
        }

        let file = match OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&self.path)
        {
            Ok(f) => f,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Cannot open lock file, assuming first instance"
                );
                return true;
            }
        };

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!(path = %self.path.display(), "Acquired instance lock");
                self.file = Some(file);
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                debug!(path = %self.path.display(), "Instance lock already held");
                false
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Lock attempt failed, assuming first instance"
                );
                true
            }
        }
    }

    /// Releases the lock. Calling this when the lock is not held is a no-op.
    pub fn release(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(e) = FileExt::unlock(&file) {
                warn!(path = %self.path.display(), error = %e, "Failed to unlock");
            } else {
                debug!(path = %self.path.display(), "Released instance lock");
            }
        }
    }

    /// Returns true while the lock is held by this value.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }
}

impl Drop for NamedLock {
    fn drop(&mut self) {
        self.release();
    }
}

/// Maps an opaque identity to a safe lock file name.
fn sanitize(identity: &str) -> String {
    identity
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
