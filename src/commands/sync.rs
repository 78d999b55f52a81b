use crate::config::{default_lock_path, load_config, Config};
use crate::error::{Result, SyncError};
use crate::git::GitCli;
use crate::lock::LockFile;
use crate::network::TcpProbe;
use crate::runner::{install_signal_handlers, Shutdown};
use crate::sync::{PassSummary, Syncer};
use std::path::PathBuf;

/// One sync-all pass over `config.entries` with the real git and TCP probe.
pub fn sync_once(config: &Config, push_override: Option<bool>) -> PassSummary {
    let vcs = GitCli::new(config.git_timeout());
    let probe = TcpProbe::default();
    let network = config.network();
    Syncer::new(&vcs, &probe, &network).sync_all(&config.entries, push_override)
}

/// `git-sync sync`: a single pass while holding the lock.
///
/// SIGINT and SIGTERM are deferred until the pass ends, so the lock is always
/// released on the way out.
pub fn run_sync_pass(push_override: Option<bool>, lock_file: Option<PathBuf>) -> Result<PassSummary> {
    let config = load_config()?;
    let lock_path = match lock_file {
        Some(path) => path,
        None => default_lock_path()?,
    };
    let _lock = LockFile::acquire(&lock_path)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let shutdown = Shutdown::new();
        install_signal_handlers(&shutdown)?;

        let summary = tokio::task::spawn_blocking(move || sync_once(&config, push_override))
            .await
            .map_err(|e| SyncError::Daemon(format!("Sync pass did not complete: {}", e)))?;

        if shutdown.is_requested() {
            tracing::info!("Sync pass finished after a stop request; releasing the lock");
        }
        Ok(summary)
    })
}
