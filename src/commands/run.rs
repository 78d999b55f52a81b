use crate::commands::sync::sync_once;
use crate::config::{default_lock_path, default_pid_path, load_config, Config};
use crate::daemon::{daemonize, DaemonOptions};
use crate::error::Result;
use crate::lock::LockFile;
use crate::runner::{install_signal_handlers, run_loop, LoopSettings, Shutdown};
use crate::sync::PassSummary;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Minutes between passes; the config value when unset.
    pub interval: Option<u64>,
    pub push_override: Option<bool>,
    pub once: bool,
    pub daemon: bool,
    pub pid_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub lock_file: Option<PathBuf>,
}

/// `git-sync run`: hold the lock, optionally detach, then sync on a fixed
/// interval until signalled.
///
/// Daemonizing forks, so it happens here before the tokio runtime exists.
pub fn run_sync_loop(options: RunOptions) -> Result<()> {
    let config = load_config()?;
    let interval_minutes = config.effective_interval_minutes(options.interval);

    // The daemon changes directory to `/`, so relative paths are fixed now.
    let lock_path = absolute(match options.lock_file {
        Some(path) => path,
        None => default_lock_path()?,
    })?;
    let mut lock = LockFile::acquire(&lock_path)?;

    let _pid_file = if options.daemon {
        let pid_file = match options.pid_file {
            Some(path) => absolute(path)?,
            None => default_pid_path()?,
        };
        let daemon_options = DaemonOptions {
            pid_file: Some(pid_file),
            log_file: options.log_file.map(absolute).transpose()?,
        };
        let pid_file = daemonize(&daemon_options)?;
        lock.refresh_owner()?;
        pid_file
    } else {
        if options.pid_file.is_some() || options.log_file.is_some() {
            tracing::warn!("--pid-file and --log-file only apply with --daemon");
        }
        None
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let push_override = options.push_override;
    let settings = LoopSettings {
        interval: Duration::from_secs(interval_minutes * 60),
        once: options.once,
    };

    let passes = runtime.block_on(async {
        let shutdown = Shutdown::new();
        install_signal_handlers(&shutdown)?;
        tracing::info!(
            "Sync loop started (every {} minute(s), lock {})",
            interval_minutes,
            lock.path().display()
        );

        run_loop(settings, &shutdown, scheduled_pass(config, push_override)).await
    })?;

    tracing::info!("Sync loop stopped after {} pass(es)", passes);
    Ok(())
}

/// The pass run on every tick, over the config read when the command started.
fn scheduled_pass(
    config: Config,
    push_override: Option<bool>,
) -> impl Fn() -> PassSummary + Send + Sync + 'static {
    move || sync_once(&config, push_override)
}

fn absolute(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path);
    }
    Ok(std::env::current_dir()?.join(path))
}
