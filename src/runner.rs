//! The repeating sync loop and the shutdown flag that ends it.

use crate::error::{Result, SyncError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Shutdown request shared between the signal handler and the run loop.
///
/// The loop polls it between passes; a pass in progress is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Sleep for `duration`, returning early if shutdown is requested.
    pub async fn sleep(&self, duration: Duration) {
        if self.is_requested() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.notify.notified() => {}
        }
    }
}

/// Request shutdown on SIGINT or SIGTERM.
pub fn install_signal_handlers(shutdown: &Shutdown) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| SyncError::Daemon(format!("Failed to install SIGTERM handler: {}", e)))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| SyncError::Daemon(format!("Failed to install SIGINT handler: {}", e)))?;

    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
            };
            tracing::info!("Received {}; stopping after the current pass", name);
            shutdown.request();
        }
    });
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    pub interval: Duration,
    /// Run exactly one pass.
    pub once: bool,
}

/// Run `pass` repeatedly, `settings.interval` apart, until a single pass was
/// requested or shutdown has been requested. Each pass runs to completion on
/// the blocking thread pool; its return value is dropped. Returns the number
/// of passes run.
pub async fn run_loop<F, T>(settings: LoopSettings, shutdown: &Shutdown, pass: F) -> Result<usize>
where
    F: Fn() -> T + Send + Sync + 'static,
    T: Send + 'static,
{
    let pass = Arc::new(pass);
    let mut passes = 0;

    loop {
        let current = Arc::clone(&pass);
        tokio::task::spawn_blocking(move || current())
            .await
            .map_err(|e| SyncError::Daemon(format!("Sync pass did not complete: {}", e)))?;
        passes += 1;

        if settings.once {
            break;
        }
        if shutdown.is_requested() {
            tracing::info!("Shutdown requested; exiting after {} pass(es)", passes);
            break;
        }

        tracing::debug!("Sleeping {}s until next pass", settings.interval.as_secs());
        shutdown.sleep(settings.interval).await;

        if shutdown.is_requested() {
            tracing::info!("Shutdown requested; exiting after {} pass(es)", passes);
            break;
        }
    }

    Ok(passes)
}
