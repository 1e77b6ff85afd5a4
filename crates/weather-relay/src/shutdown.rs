//! Signal-driven cancellation.

use std::future::Future;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Listens for the process-wide shutdown broadcast.
///
/// Once the signal has been observed, [`recv`](Self::recv) returns
/// immediately on every later call, so one receiver can be checked at
/// several await points.
#[derive(Debug)]
pub struct Shutdown {
    triggered: bool,
    receiver: broadcast::Receiver<()>,
}

impl Shutdown {
    pub fn new(receiver: broadcast::Receiver<()>) -> Self {
        Self {
            triggered: false,
            receiver,
        }
    }

    /// Broadcast shutdown once `signal` resolves.
    ///
    /// The listener task starts right away and the returned receiver is
    /// subscribed before it, so a signal that arrives while nobody is
    /// waiting on [`recv`](Self::recv) is still observed by the next call.
    pub fn on_signal<F>(signal: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = broadcast::channel(1);
        tokio::spawn(async move {
            signal.await;
            let _ = tx.send(());
        });
        Self::new(rx)
    }

    /// Whether shutdown has been observed.
    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    /// Wait for the shutdown signal. A dropped sender counts as shutdown.
    pub async fn recv(&mut self) {
        if self.triggered {
            return;
        }

        let _ = self.receiver.recv().await;
        self.triggered = true;
    }
}

/// Resolve when the process receives SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                let name = tokio::select! {
                    _ = tokio::signal::ctrl_c() => "SIGINT",
                    _ = sigterm.recv() => "SIGTERM",
                };
                info!(signal = name, "Received shutdown signal");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler, listening for SIGINT only");
            }
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!(signal = "SIGINT", "Received shutdown signal"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for SIGINT, shutdown only via process kill");
            std::future::pending::<()>().await;
        }
    }
}
