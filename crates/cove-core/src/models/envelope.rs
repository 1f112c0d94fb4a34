use serde::{Deserialize, Serialize};

use super::content::Content;
use super::id::EntityId;

/// Routing header shared by every message: who, to whom, when (seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub sender: EntityId,
    pub receiver: EntityId,
    pub time: i64,
}

impl Envelope {
    pub fn new(sender: EntityId, receiver: EntityId, time: i64) -> Self {
        Self {
            sender,
            receiver,
            time,
        }
    }
}

/// A decoded (plaintext) message as produced by the local user or by the
/// decrypt pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstantMessage {
    pub envelope: Envelope,
    pub content: Content,
    /// Delivery hint set by the sender's conversation settings.
    #[serde(default)]
    pub muted: bool,
    /// Deferred-delivery marker: the entity whose readiness this message is
    /// waiting for. Stripped before the message is buffered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waiting: Option<EntityId>,
    /// Signature of the reliable wrapper this message was decrypted from;
    /// absent for locally composed messages not yet signed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl InstantMessage {
    pub fn new(envelope: Envelope, content: Content) -> Self {
        Self {
            envelope,
            content,
            muted: false,
            waiting: None,
            signature: None,
        }
    }

    /// Group this message belongs to, from the content or the envelope.
    pub fn group(&self) -> Option<&EntityId> {
        self.content.group.as_ref()
    }
}

/// An encrypted, signed message as received from (or handed to) the
/// transport. The payload stays opaque to this core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliableMessage {
    pub envelope: Envelope,
    pub payload: serde_json::Value,
    /// Signature over the payload, hex-encoded.
    pub signature: String,
    /// Exposed group hint (set by the packer so routers need not decrypt).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<EntityId>,
    /// Deferred-delivery marker, as on [`InstantMessage`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waiting: Option<EntityId>,
    /// Set by the decrypt pipeline when a key lookup failed: the user whose
    /// key is missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_user: Option<EntityId>,
}

impl ReliableMessage {
    /// Wrap a packed payload; the raw signature bytes are kept hex-encoded.
    pub fn new(envelope: Envelope, payload: serde_json::Value, signature: &[u8]) -> Self {
        Self {
            envelope,
            payload,
            signature: hex::encode(signature),
            group: None,
            waiting: None,
            error_user: None,
        }
    }

    /// Trailing 8 chars of the signature, used as a cheap duplicate check.
    pub fn signature_fragment(&self) -> String {
        signature_fragment(&self.signature)
    }
}

/// Trailing 8 chars of a signature string (the whole string if shorter).
pub fn signature_fragment(signature: &str) -> String {
    let n = signature.len();
    if n <= 8 {
        signature.to_string()
    } else {
        signature[n - 8..].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_fragment() {
        assert_eq!(signature_fragment("abc"), "abc");
        assert_eq!(signature_fragment("0123456789abcdef"), "89abcdef");
    }

    #[test]
    fn test_reliable_message_hex_encodes_signature() {
        let env = Envelope::new(EntityId::user("alice"), EntityId::user("bob"), 100);
        let msg = ReliableMessage::new(
            env,
            serde_json::json!({"data": "opaque"}),
            &[0xca, 0xfe, 0xba, 0xbe, 0x00, 0x11, 0x22, 0x33],
        );
        assert_eq!(msg.signature, "cafebabe00112233");
        assert_eq!(msg.signature_fragment(), "00112233");
    }

    #[test]
    fn test_instant_message_group_from_content() {
        let env = Envelope::new(EntityId::user("alice"), EntityId::user("bob"), 100);
        let mut msg = InstantMessage::new(env, Content::text(1, "hi"));
        assert!(msg.group().is_none());
        msg.content.group = Some(EntityId::group("g1"));
        assert_eq!(msg.group(), Some(&EntityId::group("g1")));
    }
}
