//! Background operation: detaching from the terminal, the pid file, and
//! stopping a running daemon.

use crate::error::{Result, SyncError};
use crate::lock::read_pid;
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::{dup2, fork, setsid, ForkResult, Pid};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct DaemonOptions {
    pub pid_file: Option<PathBuf>,
    /// Where stdout and stderr go; `/dev/null` when unset.
    pub log_file: Option<PathBuf>,
}

/// Pid file written by the daemon. Removed when dropped.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    pid: i32,
}

impl PidFile {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let pid = std::process::id() as i32;
        std::fs::write(path, pid.to_string()).map_err(|e| {
            SyncError::Daemon(format!(
                "Failed to write pid file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            pid,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Ok(Some(pid)) = read_pid(&self.path) {
            if pid == self.pid {
                if let Err(e) = std::fs::remove_file(&self.path) {
                    tracing::warn!("Failed to remove pid file {}: {}", self.path.display(), e);
                }
            }
        }
    }
}

/// Detach into a background process: fork, start a new session, fork again,
/// then point stdin at `/dev/null` and stdout/stderr at the log file (append)
/// or `/dev/null`. The surviving process writes the pid file.
///
/// Must run before any other thread exists, so before the async runtime is
/// built.
pub fn daemonize(options: &DaemonOptions) -> Result<Option<PidFile>> {
    // Open everything up front so failures still reach the invoking terminal.
    let devnull = OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/null")
        .map_err(|e| SyncError::Daemon(format!("Failed to open /dev/null: {}", e)))?;
    let output = match &options.log_file {
        Some(path) => open_log_file(path)?,
        None => devnull
            .try_clone()
            .map_err(|e| SyncError::Daemon(format!("Failed to duplicate /dev/null: {}", e)))?,
    };

    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();

    fork_and_exit_parent()?;
    setsid().map_err(|e| SyncError::Daemon(format!("setsid failed: {}", e)))?;
    fork_and_exit_parent()?;

    std::env::set_current_dir("/")
        .map_err(|e| SyncError::Daemon(format!("Failed to change directory to /: {}", e)))?;

    redirect(&devnull, libc::STDIN_FILENO)?;
    redirect(&output, libc::STDOUT_FILENO)?;
    redirect(&output, libc::STDERR_FILENO)?;

    let pid_file = options
        .pid_file
        .as_deref()
        .map(PidFile::create)
        .transpose()?;

    tracing::info!("Daemon started (pid {})", std::process::id());
    Ok(pid_file)
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            SyncError::Daemon(format!(
                "Failed to open log file {}: {}",
                path.display(),
                e
            ))
        })
}

fn fork_and_exit_parent() -> Result<()> {
    // SAFETY: daemonize() runs before any other thread is started, so the
    // child inherits a consistent single-threaded process.
    match unsafe { fork() } {
        // SAFETY: _exit skips destructors and atexit handlers; the child owns
        // every resource from here on (including the lock file).
        Ok(ForkResult::Parent { .. }) => unsafe { libc::_exit(0) },
        Ok(ForkResult::Child) => Ok(()),
        Err(e) => Err(SyncError::Daemon(format!("fork failed: {}", e))),
    }
}

fn redirect(file: &File, target: i32) -> Result<()> {
    dup2(file.as_raw_fd(), target)
        .map(|_| ())
        .map_err(|e| SyncError::Daemon(format!("Failed to redirect fd {}: {}", target, e)))
}

/// Result of asking a daemon to stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReport {
    Signalled(i32),
    PidFileMissing(PathBuf),
    PidFileUnreadable { path: PathBuf, reason: String },
    InvalidPid(PathBuf),
    NoSuchProcess(i32),
    PermissionDenied(i32),
    SignalFailed { pid: i32, reason: String },
}

impl StopReport {
    pub fn is_success(&self) -> bool {
        matches!(self, StopReport::Signalled(_))
    }
}

impl std::fmt::Display for StopReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReport::Signalled(pid) => write!(f, "Sent SIGTERM to git-sync (pid {})", pid),
            StopReport::PidFileMissing(path) => {
                write!(f, "Pid file not found: {}", path.display())
            }
            StopReport::PidFileUnreadable { path, reason } => {
                write!(f, "Could not read pid file {}: {}", path.display(), reason)
            }
            StopReport::InvalidPid(path) => {
                write!(f, "Pid file {} does not contain a valid pid", path.display())
            }
            StopReport::NoSuchProcess(pid) => write!(f, "No process with pid {}", pid),
            StopReport::PermissionDenied(pid) => {
                write!(f, "Permission denied sending SIGTERM to pid {}", pid)
            }
            StopReport::SignalFailed { pid, reason } => {
                write!(f, "Failed to signal pid {}: {}", pid, reason)
            }
        }
    }
}

/// Send SIGTERM to the process recorded in `pid_file`.
pub fn stop_daemon(pid_file: &Path) -> StopReport {
    let pid = match read_pid(pid_file) {
        Ok(Some(pid)) if pid > 0 => pid,
        Ok(_) => return StopReport::InvalidPid(pid_file.to_path_buf()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return StopReport::PidFileMissing(pid_file.to_path_buf())
        }
        Err(e) => {
            return StopReport::PidFileUnreadable {
                path: pid_file.to_path_buf(),
                reason: e.to_string(),
            }
        }
    };

    match signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
        Ok(()) => StopReport::Signalled(pid),
        Err(Errno::ESRCH) => {
            tracing::debug!("Removing stale pid file {}", pid_file.display());
            let _ = std::fs::remove_file(pid_file);
            StopReport::NoSuchProcess(pid)
        }
        Err(Errno::EPERM) => StopReport::PermissionDenied(pid),
        Err(e) => StopReport::SignalFailed {
            pid,
            reason: e.to_string(),
        },
    }
}
