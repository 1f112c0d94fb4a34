use tokio::sync::broadcast;

use crate::models::{EntityId, InstantMessage};

/// What a store did to the affected record(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Add,
    Update,
    Remove,
    Clear,
}

/// Typed in-process change notifications. Delivery is best-effort within the
/// process: slow subscribers may observe `Lagged` and should re-fetch from
/// the stores instead of assuming they saw every event.
#[derive(Debug, Clone)]
pub enum Notification {
    ConversationUpdated {
        action: Action,
        id: EntityId,
        /// The message that caused the update, when there is one.
        message: Option<InstantMessage>,
    },
    MessageUpdated {
        action: Action,
        conversation: EntityId,
        sender: EntityId,
        sn: u64,
    },
    MessagesCleared {
        conversation: EntityId,
    },
    ContactsUpdated {
        action: Action,
        user: EntityId,
        contact: Option<EntityId>,
    },
    BlockListUpdated {
        action: Action,
        user: EntityId,
        entry: Option<EntityId>,
    },
    MuteListUpdated {
        action: Action,
        user: EntityId,
        entry: Option<EntityId>,
    },
    MembersUpdated {
        action: Action,
        group: EntityId,
    },
    AdminsUpdated {
        action: Action,
        group: EntityId,
    },
    DocumentUpdated {
        id: EntityId,
    },
    MetaSaved {
        id: EntityId,
    },
    LoginSaved {
        user: EntityId,
    },
    MessageTraced {
        conversation: EntityId,
        sender: EntityId,
        sn: u64,
        signature: String,
        text: String,
    },
}

/// Process-wide pub/sub for store change events.
///
/// Thin wrapper over a broadcast channel; subscriptions are explicit handles
/// that end when the receiver is dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Notification>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Publish to all current subscribers. A bus with no subscribers is not
    /// an error; the event is simply dropped.
    pub fn publish(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
