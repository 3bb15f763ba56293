use log::{info, warn};
use parking_lot::Mutex;

use crate::models::DomainEvent;

/// Outbound boundary towards the notification/chat subsystem. Events are
/// emitted after a transition commits; delivery guarantees live on the
/// consumer side.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: DomainEvent);
}

/// Default sink: structured log lines an external forwarder can tail.
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: DomainEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => info!(target: "events", "{json}"),
            Err(e) => warn!("failed to serialize domain event: {e}"),
        }
    }
}

/// Buffering sink for tests.
pub struct RecordingSink {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        RecordingSink { events: Mutex::new(Vec::new()) }
    }

    pub fn drain(&self) -> Vec<DomainEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn snapshot(&self) -> Vec<DomainEvent> {
        self.events.lock().clone()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: DomainEvent) {
        self.events.lock().push(event);
    }
}
