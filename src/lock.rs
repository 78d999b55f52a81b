//! Single-instance lock file keyed by the liveness of its owning process.

use crate::error::{Result, SyncError};
use nix::errno::Errno;
use nix::sys::signal;
use nix::unistd::Pid;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Whether a process with `pid` currently exists.
///
/// A process owned by another user still counts as alive.
pub fn process_alive(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    match signal::kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Read a pid recorded as decimal text.
pub fn read_pid(path: &Path) -> std::io::Result<Option<i32>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content.trim().parse().ok())
}

/// Held lock file. Removed when dropped.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
    pid: i32,
}

impl LockFile {
    /// Create the lock file exclusively and record this process's id in it.
    ///
    /// A lock left behind by a dead process is removed and acquisition is
    /// retried once. A lock held by a live process fails with
    /// [`SyncError::AlreadyRunning`].
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SyncError::Lock {
                path: path.to_path_buf(),
                reason: format!("failed to create directory {}: {}", parent.display(), e),
            })?;
        }

        let pid = std::process::id() as i32;
        match Self::try_create(path, pid)? {
            Some(lock) => Ok(lock),
            None => {
                Self::clear_stale(path)?;
                Self::try_create(path, pid)?.ok_or_else(|| Self::held_error(path))
            }
        }
    }

    fn try_create(path: &Path, pid: i32) -> Result<Option<Self>> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => {
                return Err(SyncError::Lock {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        };

        if let Err(e) = write!(file, "{}", pid) {
            let _ = std::fs::remove_file(path);
            return Err(SyncError::Lock {
                path: path.to_path_buf(),
                reason: format!("failed to record pid: {}", e),
            });
        }
        tracing::debug!("Acquired lock {} (pid {})", path.display(), pid);
        Ok(Some(LockFile {
            path: path.to_path_buf(),
            pid,
        }))
    }

    /// Remove the lock at `path` unless its owner is alive.
    fn clear_stale(path: &Path) -> Result<()> {
        let owner = match read_pid(path) {
            Ok(owner) => owner,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(SyncError::Lock {
                    path: path.to_path_buf(),
                    reason: format!("failed to read existing lock: {}", e),
                })
            }
        };

        if let Some(pid) = owner {
            if process_alive(pid) {
                return Err(SyncError::AlreadyRunning {
                    pid,
                    path: path.to_path_buf(),
                });
            }
        }

        tracing::warn!(
            "Removing stale lock {} (owner {})",
            path.display(),
            owner.map_or_else(|| "unknown".to_string(), |pid| pid.to_string())
        );
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SyncError::Lock {
                path: path.to_path_buf(),
                reason: format!("failed to remove stale lock: {}", e),
            }),
        }
    }

    fn held_error(path: &Path) -> SyncError {
        match read_pid(path) {
            Ok(Some(pid)) => SyncError::AlreadyRunning {
                pid,
                path: path.to_path_buf(),
            },
            _ => SyncError::Lock {
                path: path.to_path_buf(),
                reason: "lock file reappeared while acquiring".to_string(),
            },
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pid(&self) -> i32 {
        self.pid
    }

    /// Rewrite the lock with the current process id, after the process that
    /// acquired it has forked into a daemon.
    ///
    /// Fails without touching the file when it no longer names the pid this
    /// guard recorded: another instance took over the lock while the
    /// acquiring process was exiting.
    pub fn refresh_owner(&mut self) -> Result<()> {
        match read_pid(&self.path) {
            Ok(Some(owner)) if owner == self.pid => {}
            Ok(Some(owner)) => {
                return Err(SyncError::AlreadyRunning {
                    pid: owner,
                    path: self.path.clone(),
                })
            }
            Ok(None) => {
                return Err(SyncError::Lock {
                    path: self.path.clone(),
                    reason: "lock file no longer holds a pid".to_string(),
                })
            }
            Err(e) => {
                return Err(SyncError::Lock {
                    path: self.path.clone(),
                    reason: format!("lock file lost before the daemon took it over: {}", e),
                })
            }
        }

        let pid = std::process::id() as i32;
        std::fs::write(&self.path, pid.to_string()).map_err(|e| SyncError::Lock {
            path: self.path.clone(),
            reason: format!("failed to record pid: {}", e),
        })?;
        self.pid = pid;
        Ok(())
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        // Only remove the file while it still names us.
        match read_pid(&self.path) {
            Ok(Some(pid)) if pid == self.pid => {
                if let Err(e) = std::fs::remove_file(&self.path) {
                    tracing::warn!("Failed to remove lock {}: {}", self.path.display(), e);
                } else {
                    tracing::debug!("Released lock {}", self.path.display());
                }
            }
            Ok(_) => tracing::debug!(
                "Lock {} no longer belongs to pid {}; leaving it",
                self.path.display(),
                self.pid
            ),
            Err(e) => tracing::debug!("Lock {} already gone: {}", self.path.display(), e),
        }
    }
}
