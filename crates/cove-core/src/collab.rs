use async_trait::async_trait;

use crate::models::{Content, EntityId, InstantMessage, ReliableMessage};

/// Transport/crypto collaborator. Implementations own encryption, signing
/// and relay delivery; this core only decides *what* to hand them and in
/// which order.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Encrypt, sign and queue for delivery. Returns false when the message
    /// could not be handed to the transport.
    async fn send_instant_message(&self, message: InstantMessage, priority: i32) -> bool;

    /// Queue an already-packed message for delivery.
    async fn send_reliable_message(&self, message: ReliableMessage, priority: i32) -> bool;

    /// Verify, decrypt and process an incoming message; returns the packed
    /// responses to send back (may be empty).
    async fn process_reliable_message(&self, message: ReliableMessage) -> Vec<ReliableMessage>;

    /// Pack `content` into a message from `sender` (None = current user) and
    /// send it.
    async fn send_content(
        &self,
        content: Content,
        sender: Option<EntityId>,
        receiver: EntityId,
        priority: i32,
    ) -> bool;
}

/// Identity resolver collaborator: users, groups, keys and rosters.
/// Lookups answer from whatever the identity layer has locally; "not
/// resolvable yet" is an expected answer, not an error.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn current_user(&self) -> Option<EntityId>;

    /// Display name for an entity; falls back to the raw address.
    async fn name_of(&self, id: &EntityId) -> String;

    async fn contacts_of(&self, user: &EntityId) -> Vec<EntityId>;

    /// Whether a public key usable for encrypting to `user` is resolvable.
    async fn encryption_key_exists(&self, user: &EntityId) -> bool;

    /// Whether the group's bulletin document is resolvable.
    async fn bulletin_exists(&self, group: &EntityId) -> bool;

    async fn owner_of(&self, group: &EntityId) -> Option<EntityId>;

    async fn members_of(&self, group: &EntityId) -> Vec<EntityId>;
}
