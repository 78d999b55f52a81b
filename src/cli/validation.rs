use crate::error::{Result, SyncError};

/// Reject branch names git would refuse, before they land in the config.
pub fn validate_branch_name(branch_name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(SyncError::Config(format!(
            "Invalid branch name '{}': {}",
            branch_name.escape_debug(),
            reason
        )))
    };

    if branch_name.is_empty() {
        return invalid("cannot be empty");
    }
    if branch_name.starts_with('-') {
        return invalid("cannot start with '-'");
    }
    if branch_name.bytes().any(|b| b < 32 || b == 127) {
        return invalid("contains control characters");
    }

    for pattern in ["..", "~", "^", ":", "?", "*", "[", "\\", " ", "@{"] {
        if branch_name.contains(pattern) {
            return invalid(&format!("cannot contain '{}'", pattern));
        }
    }

    if branch_name.starts_with('/') || branch_name.ends_with('/') {
        return invalid("cannot start or end with '/'");
    }
    if branch_name.contains("//") {
        return invalid("cannot contain consecutive slashes");
    }
    if branch_name.starts_with('.') || branch_name.ends_with('.') {
        return invalid("cannot start or end with '.'");
    }
    if branch_name.ends_with(".lock") {
        return invalid("cannot end with '.lock'");
    }
    if branch_name == "@" {
        return invalid("cannot be '@'");
    }

    Ok(())
}

pub fn validate_remote_url(remote: &str) -> Result<()> {
    if remote.trim().is_empty() {
        return Err(SyncError::Config("Remote URL cannot be empty".to_string()));
    }
    if remote.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(SyncError::Config(format!(
            "Remote URL '{}' cannot contain whitespace or control characters",
            remote.escape_debug()
        )));
    }
    Ok(())
}
