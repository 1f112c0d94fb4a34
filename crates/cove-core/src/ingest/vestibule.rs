use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::bus::{EventBus, Notification};
use crate::collab::{Directory, Messenger};
use crate::models::{EntityId, InstantMessage, ReliableMessage};

/// Send priority used when replaying buffered messages.
const PRIORITY_NORMAL: i32 = 1;

/// Deferred-delivery buffer for messages whose cryptographic prerequisites
/// (a user's encryption key, a group's bulletin/owner/roster) are not
/// resolvable yet.
///
/// Each buffered message waits on exactly one entity id. A readiness event
/// for that id triggers exactly one replay attempt; success or failure, the
/// message leaves the buffer.
pub struct Vestibule {
    directory: Arc<dyn Directory>,
    messenger: Arc<dyn Messenger>,
    inbound: Mutex<HashMap<EntityId, Vec<ReliableMessage>>>,
    outbound: Mutex<HashMap<EntityId, Vec<InstantMessage>>>,
}

impl Vestibule {
    pub fn new(directory: Arc<dyn Directory>, messenger: Arc<dyn Messenger>) -> Arc<Self> {
        Arc::new(Self {
            directory,
            messenger,
            inbound: Mutex::new(HashMap::new()),
            outbound: Mutex::new(HashMap::new()),
        })
    }

    /// Buffer an inbound message that could not be processed yet.
    pub async fn suspend_reliable_message(&self, mut message: ReliableMessage) {
        let waiting = message
            .waiting
            .take()
            .or_else(|| message.error_user.clone())
            .or_else(|| message.group.clone())
            .unwrap_or_else(|| message.envelope.sender.clone());
        tracing::info!(waiting = %waiting, sender = %message.envelope.sender,
            "inbound message suspended");
        self.inbound
            .lock()
            .await
            .entry(waiting)
            .or_default()
            .push(message);
    }

    /// Buffer an outbound message that cannot be encrypted yet.
    pub async fn suspend_instant_message(&self, mut message: InstantMessage) {
        let waiting = message
            .waiting
            .take()
            .or_else(|| message.content.group.clone())
            .unwrap_or_else(|| message.envelope.receiver.clone());
        tracing::info!(waiting = %waiting, receiver = %message.envelope.receiver,
            "outbound message suspended");
        self.outbound
            .lock()
            .await
            .entry(waiting)
            .or_default()
            .push(message);
    }

    /// Whether the prerequisites for `id` are resolvable now.
    pub async fn is_ready(&self, id: &EntityId) -> bool {
        if id.is_group() {
            self.directory.bulletin_exists(id).await
                && self.directory.owner_of(id).await.is_some()
                && !self.directory.members_of(id).await.is_empty()
        } else if id.is_user() {
            self.directory.encryption_key_exists(id).await
        } else {
            // Broadcast addresses need no key material.
            true
        }
    }

    /// React to a store notification that may have made an entity ready.
    pub async fn on_notification(&self, notification: &Notification) {
        let candidate = match notification {
            Notification::MetaSaved { id } => id,
            Notification::DocumentUpdated { id } => id,
            Notification::MembersUpdated { group, .. } => group,
            _ => return,
        };
        if self.is_ready(candidate).await {
            self.resume_messages(candidate).await;
        }
    }

    /// Drain both buffers for `id` and replay in buffered order. Entries are
    /// removed before processing; a failure on one message does not stop the
    /// rest.
    pub async fn resume_messages(&self, id: &EntityId) {
        let outbound = self.outbound.lock().await.remove(id);
        let inbound = self.inbound.lock().await.remove(id);

        if let Some(messages) = outbound {
            for message in messages {
                if !self
                    .messenger
                    .send_instant_message(message, PRIORITY_NORMAL)
                    .await
                {
                    tracing::warn!(id = %id, "replayed outbound message failed to send");
                }
            }
        }
        if let Some(messages) = inbound {
            for message in messages {
                let responses = self.messenger.process_reliable_message(message).await;
                for response in responses {
                    if !self
                        .messenger
                        .send_reliable_message(response, PRIORITY_NORMAL)
                        .await
                    {
                        tracing::warn!(id = %id, "response to replayed message failed to send");
                    }
                }
            }
        }
    }

    /// Buffered message counts `(inbound, outbound)`, for diagnostics.
    pub async fn pending_counts(&self) -> (usize, usize) {
        let inbound = self.inbound.lock().await.values().map(Vec::len).sum();
        let outbound = self.outbound.lock().await.values().map(Vec::len).sum();
        (inbound, outbound)
    }

    /// Consume bus notifications until the bus closes. Lagged subscribers
    /// skip ahead; a missed readiness event is recovered by the next one.
    pub fn spawn(self: &Arc<Self>, bus: &EventBus) -> tokio::task::JoinHandle<()> {
        let vestibule = self.clone();
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(notification) => vestibule.on_notification(&notification).await,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "vestibule lagged behind the bus");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
