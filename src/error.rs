use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to execute 'git {command}' in {workdir}: {source}")]
    GitSpawn {
        command: String,
        workdir: PathBuf,
        source: std::io::Error,
    },

    #[error("Git error: {0}")]
    Git(String),

    #[error("'git {command}' timed out after {secs}s in {workdir}")]
    GitTimeout {
        command: String,
        workdir: PathBuf,
        secs: u64,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Path already tracked: {0}")]
    AlreadyTracked(PathBuf),

    #[error("Path not found: {0}")]
    NotTracked(PathBuf),

    #[error("git-sync is already running (pid {pid}, lock file {path})")]
    AlreadyRunning { pid: i32, path: PathBuf },

    #[error("Failed to acquire lock file {path}: {reason}")]
    Lock { path: PathBuf, reason: String },

    #[error("Daemon error: {0}")]
    Daemon(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Json(err.to_string())
    }
}
