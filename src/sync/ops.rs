use crate::config::Entry;
use crate::error::{Result, SyncError};
use crate::git::Vcs;
use chrono::{DateTime, Local};
use std::path::Path;

pub const ORIGIN: &str = "origin";

/// Ahead/behind counts of the pinned branch against `origin/<branch>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Divergence {
    pub ahead: u32,
    pub behind: u32,
    /// Whether `refs/remotes/origin/<branch>` exists.
    pub tracking: bool,
}

pub fn remote_tracking_ref(branch: &str) -> String {
    format!("refs/remotes/{}/{}", ORIGIN, branch)
}

pub fn upstream_name(branch: &str) -> String {
    format!("{}/{}", ORIGIN, branch)
}

pub fn commit_message(template: &str, now: DateTime<Local>) -> String {
    format!("{} ({})", template, now.format("%Y-%m-%d %H:%M:%S"))
}

/// Initialize a repository at the entry's path if none exists yet.
///
/// Returns whether a repository was created.
pub fn ensure_repository<V: Vcs + ?Sized>(vcs: &V, entry: &Entry) -> Result<bool> {
    let path = entry.path.as_path();
    if vcs.is_repository(path) {
        return Ok(false);
    }

    tracing::info!("Initializing repo at {}", path.display());
    std::fs::create_dir_all(path).map_err(|e| SyncError::InvalidPath {
        path: path.display().to_string(),
        reason: format!("failed to create directory: {}", e),
    })?;

    let init = vcs.init(path, Some(&entry.branch))?;
    if !init.success {
        tracing::debug!(
            "git init -b {} failed ({}), falling back to plain init",
            entry.branch,
            init.message()
        );
        let init = vcs.init(path, None)?;
        if !init.success {
            return Err(SyncError::Git(format!(
                "Failed to initialize repository at {}: {}",
                path.display(),
                init.message()
            )));
        }
        let checkout = vcs.checkout_branch(path, &entry.branch)?;
        if !checkout.success {
            tracing::warn!(
                "Failed to switch {} to branch {}: {}",
                path.display(),
                entry.branch,
                checkout.message()
            );
        }
    }

    if let Some(remote) = entry.remote.as_deref() {
        add_origin(vcs, path, remote)?;
    }

    Ok(true)
}

/// Register the entry's remote as `origin` unless an `origin` already exists.
/// An existing `origin` is never overwritten.
pub fn ensure_remote<V: Vcs + ?Sized>(vcs: &V, entry: &Entry) -> Result<()> {
    let Some(remote) = entry.remote.as_deref() else {
        return Ok(());
    };
    if has_origin(vcs, &entry.path)? {
        return Ok(());
    }
    add_origin(vcs, &entry.path, remote)
}

fn add_origin<V: Vcs + ?Sized>(vcs: &V, path: &Path, remote: &str) -> Result<()> {
    let output = vcs.add_remote(path, ORIGIN, remote)?;
    if output.success {
        tracing::info!("Added remote {} for {}", remote, path.display());
    } else {
        tracing::warn!(
            "Failed to add remote {} for {}: {}",
            remote,
            path.display(),
            output.message()
        );
    }
    Ok(())
}

pub fn has_origin<V: Vcs + ?Sized>(vcs: &V, path: &Path) -> Result<bool> {
    Ok(vcs.remotes(path)?.iter().any(|name| name == ORIGIN))
}

/// Force the checked-out branch to the entry's pinned branch.
///
/// An unborn HEAD (no commits yet) is left alone.
pub fn align_branch<V: Vcs + ?Sized>(vcs: &V, entry: &Entry) -> Result<()> {
    let path = entry.path.as_path();
    let Some(current) = vcs.current_branch(path)? else {
        return Ok(());
    };
    if current == entry.branch {
        return Ok(());
    }

    tracing::info!(
        "Switching {} from {} to {}",
        path.display(),
        current,
        entry.branch
    );
    let output = vcs.checkout_branch(path, &entry.branch)?;
    if !output.success {
        return Err(SyncError::Git(format!(
            "Failed to check out {} in {}: {}",
            entry.branch,
            path.display(),
            output.message()
        )));
    }
    Ok(())
}

/// Stage and commit everything if the working tree is dirty.
///
/// Returns whether a commit was created. A commit git declines to create is
/// reported as `false`, not as an error.
pub fn commit_if_dirty<V: Vcs + ?Sized>(vcs: &V, entry: &Entry) -> Result<bool> {
    let path = entry.path.as_path();
    if vcs.status_porcelain(path)?.trim().is_empty() {
        tracing::info!("Idle: {}", path.display());
        return Ok(false);
    }

    vcs.add_all(path)?;
    let message = commit_message(&entry.commit_message, Local::now());
    let output = vcs.commit(path, &message)?;
    if !output.success {
        tracing::info!("Nothing to commit in {}: {}", path.display(), output.message());
        return Ok(false);
    }

    tracing::info!("Committed changes in {}", path.display());
    Ok(true)
}

/// Ahead/behind counts against the remote-tracking branch; `(0, 0)` when it
/// does not exist yet.
pub fn divergence<V: Vcs + ?Sized>(vcs: &V, path: &Path, branch: &str) -> Result<Divergence> {
    if !vcs.has_ref(path, &remote_tracking_ref(branch))? {
        return Ok(Divergence::default());
    }
    let (ahead, behind) = vcs.ahead_behind(path, &upstream_name(branch), branch)?;
    Ok(Divergence {
        ahead,
        behind,
        tracking: true,
    })
}

/// Best-effort `rebase --abort`; failure is logged, never escalated.
pub fn abort_rebase<V: Vcs + ?Sized>(vcs: &V, path: &Path) {
    match vcs.rebase_abort(path) {
        Ok(output) if output.success => {}
        Ok(output) => tracing::warn!(
            "Rebase abort failed for {}; repository may be left mid-rebase: {}",
            path.display(),
            output.message()
        ),
        Err(e) => tracing::warn!(
            "Rebase abort failed for {}; repository may be left mid-rebase: {}",
            path.display(),
            e
        ),
    }
}
