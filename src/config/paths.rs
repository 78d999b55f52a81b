use crate::error::{Result, SyncError};
use directories::ProjectDirs;
use std::path::{Component, Path, PathBuf};

pub const CONFIG_DIR_ENV: &str = "GIT_SYNC_CONFIG_DIR";
pub const DATA_DIR_ENV: &str = "GIT_SYNC_DATA_DIR";

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "git-sync")
        .ok_or_else(|| SyncError::Config("Could not determine config directory".to_string()))
}

pub fn get_config_dir() -> Result<PathBuf> {
    if let Ok(config_dir) = std::env::var(CONFIG_DIR_ENV) {
        if !config_dir.is_empty() {
            return Ok(PathBuf::from(config_dir));
        }
    }
    Ok(project_dirs()?.config_dir().to_path_buf())
}

pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}

/// Directory for runtime artifacts: the default lock file and pid file.
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(data_dir) = std::env::var(DATA_DIR_ENV) {
        if !data_dir.is_empty() {
            return Ok(PathBuf::from(data_dir));
        }
    }
    Ok(project_dirs()?.data_local_dir().to_path_buf())
}

pub fn default_lock_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("sync.lock"))
}

pub fn default_pid_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("git-sync.pid"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    let path = path.trim();
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    } else if path == "~" {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home);
        }
    }
    PathBuf::from(path)
}

/// Resolve a user-supplied directory into the key used for the tracked set.
///
/// The directory does not need to exist yet: symlinks are resolved through the
/// longest existing ancestor and the remaining components are appended.
pub fn resolve_entry_path(raw: &str) -> Result<PathBuf> {
    if raw.trim().is_empty() {
        return Err(SyncError::InvalidPath {
            path: raw.to_string(),
            reason: "path is empty".to_string(),
        });
    }

    let expanded = expand_tilde(raw);
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()?.join(expanded)
    };

    let normalized = normalize_path(&absolute).ok_or_else(|| SyncError::InvalidPath {
        path: raw.to_string(),
        reason: "attempts to escape root directory with ../".to_string(),
    })?;

    canonicalize_existing_prefix(&normalized)
}

/// Lexically drop `.` and fold `..` components. Returns `None` if `..` would
/// climb above the root.
fn normalize_path(path: &Path) -> Option<PathBuf> {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    return None;
                }
            }
            _ => result.push(component),
        }
    }
    Some(result)
}

fn canonicalize_existing_prefix(path: &Path) -> Result<PathBuf> {
    let mut existing = path;
    let mut missing = Vec::new();

    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(path.to_path_buf()),
        }
    }

    let mut resolved = std::fs::canonicalize(existing)?;
    for name in missing.iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}
