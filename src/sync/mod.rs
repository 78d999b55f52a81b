//! Per-entry synchronization and the sync-all pass over every tracked entry.

use crate::config::{Entry, NetworkSettings};
use crate::error::Result;
use crate::git::Vcs;
use crate::network::{remote_reachable, Probe};

pub mod ops;
pub mod types;

pub use crate::sync::ops::{divergence, Divergence, ORIGIN};
pub use crate::sync::types::{EntryReport, PassSummary, SyncOutcome};

use crate::sync::ops::{
    abort_rebase, align_branch, commit_if_dirty, ensure_remote, ensure_repository, has_origin,
    upstream_name,
};

/// Runs the decision procedure against a version-control backend and a
/// connectivity probe.
pub struct Syncer<'a, V: Vcs + ?Sized, P: Probe + ?Sized> {
    vcs: &'a V,
    probe: &'a P,
    network: &'a NetworkSettings,
}

impl<'a, V: Vcs + ?Sized, P: Probe + ?Sized> Syncer<'a, V, P> {
    pub fn new(vcs: &'a V, probe: &'a P, network: &'a NetworkSettings) -> Self {
        Self {
            vcs,
            probe,
            network,
        }
    }

    /// Bring one entry in line with its remote.
    ///
    /// Steps run in a fixed order and stop at the first outcome that ends the
    /// pass for this entry. Local changes are always committed before any
    /// rebase, so a rebase never sees a dirty working tree.
    pub fn sync_entry(&self, entry: &Entry, push_override: Option<bool>) -> Result<SyncOutcome> {
        let vcs = self.vcs;
        let path = entry.path.as_path();

        ensure_repository(vcs, entry)?;
        ensure_remote(vcs, entry)?;
        align_branch(vcs, entry)?;

        if !entry.push_enabled(push_override) {
            let committed = commit_if_dirty(vcs, entry)?;
            return Ok(SyncOutcome::LocalOnly { committed });
        }

        if !has_origin(vcs, path)? {
            let committed = commit_if_dirty(vcs, entry)?;
            tracing::info!("No remote configured for {}; skipping push", path.display());
            return Ok(SyncOutcome::NoRemote { committed });
        }

        if !remote_reachable(self.probe, entry.remote.as_deref(), self.network) {
            let committed = commit_if_dirty(vcs, entry)?;
            tracing::info!("Offline; will push {} on next run", path.display());
            return Ok(SyncOutcome::Offline { committed });
        }

        let fetch = vcs.fetch(path, ORIGIN, &entry.branch)?;
        if !fetch.success {
            if fetch.is_missing_remote_ref() {
                tracing::info!(
                    "Branch {} does not exist on {} yet for {}",
                    entry.branch,
                    ORIGIN,
                    path.display()
                );
            } else {
                tracing::warn!("Fetch failed for {}: {}", path.display(), fetch.message());
                return Ok(SyncOutcome::FetchFailed);
            }
        }

        let committed = commit_if_dirty(vcs, entry)?;

        let mut state = divergence(vcs, path, &entry.branch)?;
        let mut rebased = false;
        if state.behind > 0 {
            tracing::info!(
                "{} is {} ahead, {} behind {}; rebasing",
                path.display(),
                state.ahead,
                state.behind,
                upstream_name(&entry.branch)
            );
            let rebase = vcs.rebase(path, &upstream_name(&entry.branch))?;
            if !rebase.success {
                abort_rebase(vcs, path);
                tracing::warn!("Rebase failed for {}: {}", path.display(), rebase.message());
                return Ok(SyncOutcome::RebaseFailed { committed });
            }
            rebased = true;
            state = divergence(vcs, path, &entry.branch)?;
        }

        if state.tracking && state.ahead == 0 {
            tracing::info!("Up to date: {}", path.display());
            return Ok(SyncOutcome::UpToDate { committed });
        }

        if !state.tracking && !vcs.has_commits(path)? {
            tracing::info!("Nothing to push yet for {}", path.display());
            return Ok(SyncOutcome::UpToDate { committed });
        }

        let push = vcs.push(path, ORIGIN, &entry.branch)?;
        if !push.success {
            tracing::warn!("Push failed for {}: {}", path.display(), push.message());
            return Ok(SyncOutcome::PushFailed { committed });
        }

        tracing::info!("Pushed {} to {}", path.display(), upstream_name(&entry.branch));
        Ok(SyncOutcome::Pushed { committed, rebased })
    }

    /// Run [`Syncer::sync_entry`] for every entry in order. A failure in one
    /// entry is logged with its path and never stops the remaining entries.
    pub fn sync_all(&self, entries: &[Entry], push_override: Option<bool>) -> PassSummary {
        let mut summary = PassSummary::default();

        if entries.is_empty() {
            tracing::info!("No tracked paths; add one first.");
            return summary;
        }

        for entry in entries {
            let result = self.sync_entry(entry, push_override).map_err(|e| {
                tracing::error!("Error syncing {}: {}", entry.path.display(), e);
                e.to_string()
            });
            summary.reports.push(EntryReport {
                path: entry.path.clone(),
                result,
            });
        }

        tracing::info!(
            "Sync pass finished: {} entries, {} committed, {} pushed, {} failed",
            summary.attempted(),
            summary.committed(),
            summary.pushed(),
            summary.failed()
        );
        summary
    }
}
