//! Graceful shutdown handling
//!
//! One [`ShutdownSignal`] is shared by the API server and the background
//! reservation tasks. The [`ShutdownCoordinator`] owns it, listens for OS
//! signals and bounds how long cleanup may take once it fires.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

/// Latched stop flag. Once triggered it stays triggered, so waiters that
/// subscribe late still resolve.
#[derive(Clone)]
pub struct ShutdownSignal {
    stopped: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (stopped, _) = watch::channel(false);
        Self {
            stopped: Arc::new(stopped),
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.stopped.borrow()
    }

    pub fn trigger(&self) {
        let first = self.stopped.send_if_modified(|stopped| !std::mem::replace(stopped, true));
        if first {
            info!("🛑 Shutdown requested");
        }
    }

    pub async fn wait(&self) {
        self.notified().await;
    }

    /// Owned future resolving on shutdown, for use in `select!` loops.
    pub fn notified(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut receiver = self.stopped.subscribe();
        async move {
            // Err only when the sender is gone, which also means stop.
            let _ = receiver.wait_for(|stopped| *stopped).await;
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves with the name of the first termination signal received, or
/// `None` when no handler could be installed.
async fn termination_signal() -> Option<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                return None;
            }
        };
        let mut int = match signal(SignalKind::interrupt()) {
            Ok(int) => int,
            Err(e) => {
                warn!(error = %e, "SIGINT handler unavailable");
                return None;
            }
        };

        tokio::select! {
            _ = term.recv() => Some("SIGTERM"),
            _ = int.recv() => Some("SIGINT"),
        }
    }

    #[cfg(not(unix))]
    {
        match tokio::signal::ctrl_c().await {
            Ok(()) => Some("Ctrl+C"),
            Err(e) => {
                warn!(error = %e, "Ctrl+C handler unavailable");
                None
            }
        }
    }
}

/// Owns the process-wide [`ShutdownSignal`] and the cleanup deadline.
pub struct ShutdownCoordinator {
    signal: ShutdownSignal,
    cleanup_timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            signal: ShutdownSignal::new(),
            cleanup_timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn signal(&self) -> ShutdownSignal {
        self.signal.clone()
    }

    /// Trigger the signal on SIGTERM or SIGINT.
    pub fn start_signal_listener(&self) {
        let signal = self.signal.clone();
        tokio::spawn(async move {
            if let Some(name) = termination_signal().await {
                info!(signal = name, "📡 Termination signal received");
                signal.trigger();
            }
        });
    }

    /// Wait for the signal, then run `cleanup` within the configured
    /// deadline. `false` means cleanup was cut off.
    pub async fn shutdown_with_cleanup<F, Fut>(&self, cleanup: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        self.signal.wait().await;
        let timeout_secs = self.cleanup_timeout.as_secs();
        info!(timeout_secs, "⏳ Draining server tasks");

        if tokio::time::timeout(self.cleanup_timeout, cleanup())
            .await
            .is_ok()
        {
            info!("✅ Server tasks drained");
            true
        } else {
            warn!(timeout_secs, "⚠️ Server tasks still running at deadline");
            false
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(30)
    }
}
