//! Lifecycle of the standalone binary.
//!
//! ```text
//! SIGINT/SIGTERM (signals.rs) → Shutdown::trigger
//!     → every HttpServer::run receiver resolves → server drains and exits
//! ```

pub mod signals;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub use signals::wait_for_signal;

/// One-shot stop event fanned out to every running server.
///
/// Clones share the channel. Receivers taken after [`trigger`](Self::trigger)
/// never see the event, so subscribe before serving.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self {
            tx: broadcast::channel(1).0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        if self.tx.send(()).is_err() {
            tracing::debug!("Shutdown triggered with no running server");
        }
    }

    /// Trigger on the first SIGINT or SIGTERM.
    pub fn listen_for_signals(&self) -> JoinHandle<()> {
        tokio::spawn(wait_for_signal(self.clone()))
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
