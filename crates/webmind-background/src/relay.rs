//! Relays lifecycle events to every listening surface.

use tokio::sync::broadcast;
use tracing::trace;

use webmind_runtime::{LifecycleEvent, LifecycleObserver};

use crate::protocol::Event;

/// Buffered events per listener before slow listeners start lagging.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Lifecycle observer that republishes events on a broadcast channel.
///
/// Publishing never fails: with no listeners the event is dropped.
#[derive(Debug, Clone)]
pub struct EventRelay {
    sender: broadcast::Sender<Event>,
}

impl EventRelay {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Start listening; only events published afterwards are received.
    pub fn listen(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: Event) {
        if self.sender.send(event).is_err() {
            trace!("No surface listening; event dropped");
        }
    }
}

impl Default for EventRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleObserver for EventRelay {
    fn on_event(&self, event: &LifecycleEvent) {
        self.publish(Event::from(event));
    }
}
