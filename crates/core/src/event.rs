//! Domain event system: decoupled observation of a running session.
//!
//! Events are published when something interesting happens in the system.
//! Other components can subscribe to react without tight coupling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A frame stream was opened and accepted into the ingestion pool
    FrameReceived {
        stream_id: String,
        participant: String,
        timestamp: DateTime<Utc>,
    },

    /// A frame became an image turn
    FrameFused {
        stream_id: String,
        participant: String,
        bytes: usize,
        context_version: u64,
        timestamp: DateTime<Utc>,
    },

    /// A frame was abandoned (read failure, bad image, cancelled, pool full)
    FrameDropped {
        stream_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed
    ToolExecuted {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The output gate admitted or suppressed an utterance
    OutputGated {
        emitted: bool,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The user's location was updated
    LocationUpdated {
        participant: String,
        timestamp: DateTime<Utc>,
    },

    /// Session lifecycle changed
    SessionStateChanged {
        session_id: String,
        state: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
/// Components can subscribe to receive all events and filter for what they care about.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::FrameFused {
            stream_id: "s1".into(),
            participant: "user-1".into(),
            bytes: 1024,
            context_version: 3,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::FrameFused {
                stream_id,
                context_version,
                ..
            } => {
                assert_eq!(stream_id, "s1");
                assert_eq!(*context_version, 3);
            }
            _ => panic!("Expected FrameFused event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(DomainEvent::FrameDropped {
            stream_id: "s2".into(),
            reason: "no subscribers".into(),
            timestamp: Utc::now(),
        });
    }
}
