use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MIN_INTERVAL_MINUTES: u64 = 1;
pub const DEFAULT_INTERVAL_MINUTES: u64 = 5;
pub const DEFAULT_NETWORK_HOST: &str = "github.com";
pub const DEFAULT_NETWORK_PORT: u16 = 443;
pub const MIN_GIT_TIMEOUT_SECS: u64 = 1;
pub const DEFAULT_GIT_TIMEOUT_SECS: u64 = 30;

/// One tracked directory and its sync policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    #[serde(default = "super::default_branch")]
    pub branch: String,
    #[serde(default = "super::default_push")]
    pub push: bool,
    #[serde(default = "super::default_commit_message")]
    pub commit_message: String,
}

impl Entry {
    /// Create an entry with default branch, push and commit message settings.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            remote: None,
            branch: super::default_branch(),
            push: super::default_push(),
            commit_message: super::default_commit_message(),
        }
    }

    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = Some(remote.into());
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn with_push(mut self, push: bool) -> Self {
        self.push = push;
        self
    }

    pub fn with_commit_message(mut self, message: impl Into<String>) -> Self {
        self.commit_message = message.into();
        self
    }

    /// Push policy for one run, with `push_override` taking precedence.
    pub fn push_enabled(&self, push_override: Option<bool>) -> bool {
        push_override.unwrap_or(self.push)
    }
}

/// Connectivity target used when a remote does not name its own host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSettings {
    pub host: String,
    pub port: u16,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_NETWORK_HOST.to_string(),
            port: DEFAULT_NETWORK_PORT,
        }
    }
}

// Scalars come before `entries` so the TOML serializer emits them ahead of
// the `[[entries]]` tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "super::default_interval_minutes")]
    pub interval_minutes: u64,
    #[serde(default = "super::default_network_host")]
    pub network_host: String,
    #[serde(default = "super::default_network_port")]
    pub network_port: u16,
    #[serde(default = "super::default_git_timeout_secs")]
    pub git_timeout_secs: u64,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            network_host: DEFAULT_NETWORK_HOST.to_string(),
            network_port: DEFAULT_NETWORK_PORT,
            git_timeout_secs: DEFAULT_GIT_TIMEOUT_SECS,
            entries: Vec::new(),
        }
    }
}

impl Config {
    pub fn network(&self) -> NetworkSettings {
        NetworkSettings {
            host: self.network_host.clone(),
            port: self.network_port,
        }
    }

    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_secs.max(MIN_GIT_TIMEOUT_SECS))
    }

    /// Interval between passes, preferring an explicit override. Both sources
    /// are clamped to [`MIN_INTERVAL_MINUTES`].
    pub fn effective_interval_minutes(&self, interval_override: Option<u64>) -> u64 {
        let requested = interval_override.unwrap_or(self.interval_minutes);
        clamp_interval(requested)
    }

    pub fn find_entry(&self, path: &Path) -> Option<&Entry> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// Track a new entry. The tracked set is keyed by resolved path.
    pub fn add_entry(&mut self, entry: Entry) -> Result<()> {
        if self.find_entry(&entry.path).is_some() {
            return Err(SyncError::AlreadyTracked(entry.path));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Stop tracking the entry whose path matches exactly.
    pub fn remove_entry(&mut self, path: &Path) -> Result<Entry> {
        let index = self
            .entries
            .iter()
            .position(|e| e.path == path)
            .ok_or_else(|| SyncError::NotTracked(path.to_path_buf()))?;
        Ok(self.entries.remove(index))
    }
}

pub fn clamp_interval(minutes: u64) -> u64 {
    if minutes < MIN_INTERVAL_MINUTES {
        tracing::warn!(
            "Interval too low ({}); using {} minute",
            minutes,
            MIN_INTERVAL_MINUTES
        );
        return MIN_INTERVAL_MINUTES;
    }
    minutes
}

/// Apply invariants that deserialization alone cannot enforce.
pub fn validate_config(config: &mut Config) {
    config.interval_minutes = clamp_interval(config.interval_minutes);

    if config.git_timeout_secs < MIN_GIT_TIMEOUT_SECS {
        tracing::warn!(
            "git_timeout_secs ({}) is below the minimum of {}s",
            config.git_timeout_secs,
            MIN_GIT_TIMEOUT_SECS
        );
        config.git_timeout_secs = MIN_GIT_TIMEOUT_SECS;
    }
}
