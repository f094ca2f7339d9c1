use tokio::sync::broadcast;
use tracing::trace;

/// Events the rest of the app reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemEvent {
    DownloadComplete { item_id: String },
}

/// Process-wide event bus, passed explicitly to whoever publishes or listens.
#[derive(Debug, Clone)]
pub struct SystemEvents {
    tx: broadcast::Sender<SystemEvent>,
}

impl SystemEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    pub fn publish(&self, event: SystemEvent) {
        trace!(?event, "Publishing system event");
        // No listeners yet is fine
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SystemEvent> {
        self.tx.subscribe()
    }
}

impl Default for SystemEvents {
    fn default() -> Self {
        Self::new()
    }
}
