use serde::{Deserialize, Serialize};

use super::envelope::{signature_fragment, InstantMessage};
use super::id::EntityId;
use crate::error::{StoreError, StoreResult};

/// One persisted instant message.
///
/// The row identity is `(conversation, sender, sn)`; a resend with the same
/// key updates the row in place, it never duplicates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub conversation: EntityId,
    pub sender: EntityId,
    pub sn: u64,
    pub time: i64,
    pub type_tag: u32,
    /// Trailing fragment of the signature (empty for outgoing plaintext).
    pub sig_fragment: String,
    /// Full serialized envelope + content, attachment bytes stripped.
    pub payload: String,
}

impl MessageRecord {
    /// Build the row for an instant message assigned to `conversation`.
    /// Attachment bytes are dropped from the serialized payload so row size
    /// stays bounded.
    pub fn from_instant(conversation: EntityId, message: &InstantMessage) -> StoreResult<Self> {
        let content = message.content.for_storage();
        let stored = InstantMessage {
            envelope: message.envelope.clone(),
            content: content.clone(),
            muted: message.muted,
            waiting: None,
            signature: message.signature.clone(),
        };
        let payload = serde_json::to_string(&stored)?;
        let time = content.time.unwrap_or(message.envelope.time);
        if time <= 0 {
            return Err(StoreError::InvalidRecord(format!(
                "message without a usable time: {} sn={}",
                message.envelope.sender, content.sn
            )));
        }
        Ok(Self {
            conversation,
            sender: message.envelope.sender.clone(),
            sn: content.sn,
            time,
            type_tag: content.type_tag(),
            sig_fragment: message
                .signature
                .as_deref()
                .map(signature_fragment)
                .unwrap_or_default(),
            payload,
        })
    }

    /// Decode the stored payload back into an instant message.
    pub fn to_instant(&self) -> StoreResult<InstantMessage> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}
