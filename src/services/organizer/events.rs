//! Change notifications for organization results

use tokio::sync::broadcast;

use crate::db::OrganizationResult;

#[derive(Debug, Clone)]
pub enum OrganizationEvent {
    ItemAdded(OrganizationResult),
    ItemUpdated(OrganizationResult),
    ItemRemoved(String),
    LogReset,
}

/// Fire-and-forget broadcast of [`OrganizationEvent`]s
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: broadcast::Sender<OrganizationEvent>,
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrganizationEvent> {
        self.sender.subscribe()
    }

    /// Send to current subscribers; nobody listening is fine
    pub fn emit(&self, event: OrganizationEvent) {
        let _ = self.sender.send(event);
    }
}
