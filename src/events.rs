//! In-process event bus.
//!
//! Services publish typed events; any number of subscribers (UI surfaces,
//! tests) receive them over a `tokio::sync::broadcast` channel. Emitting with
//! no subscribers is fine and the event is dropped.

use tokio::sync::broadcast;

use crate::types::{ConnectionStatus, FollowStatus};

/// Everything the service layer announces to the rest of the process.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    FollowStatusChanged {
        target_id: String,
        status: FollowStatus,
    },
    ConnectionStatusChanged {
        target_id: String,
        status: ConnectionStatus,
    },
    EventRegistrationChanged {
        event_id: String,
        attendee_id: String,
    },
    NotificationCreated {
        user_id: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. A send error only means nobody is listening.
    pub fn emit(&self, event: AppEvent) {
        if let Err(e) = self.sender.send(event) {
            log::trace!("event dropped, no subscribers: {:?}", e.0);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
