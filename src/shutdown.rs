use tokio::sync::watch;

// ============================================================================
// Shutdown Coordination - cooperative stop signal for long-running workers
// ============================================================================
//
// One `Shutdown` controller lives in main. Every worker holds a
// `ShutdownListener` and checks it between units of work, so an in-flight
// message always completes before the worker stops.
// ============================================================================

/// Broadcasts the stop signal to every listener.
pub struct Shutdown {
    sender: watch::Sender<bool>,
}

/// Worker-side handle that resolves once shutdown has been requested.
#[derive(Clone)]
pub struct ShutdownListener {
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
        }
    }

    /// Flips the signal. Listeners created afterwards see it immediately.
    pub fn trigger(&self) {
        let _ = self.sender.send(true);
    }

    /// Blocks until SIGINT or SIGTERM arrives, then triggers shutdown.
    pub async fn wait_for_signal(&self) {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => tracing::info!("🛑 Received Ctrl+C, shutting down"),
            _ = terminate => tracing::info!("🛑 Received SIGTERM, shutting down"),
        }

        self.trigger();
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownListener {
    /// Resolves once shutdown is triggered. A dropped controller also counts
    /// as a stop request.
    pub async fn stopped(&mut self) {
        let _ = self.receiver.wait_for(|stop| *stop).await;
    }

    pub fn is_stopped(&self) -> bool {
        *self.receiver.borrow()
    }
}

// ============================================================================
// Tests
// ============================================================================
