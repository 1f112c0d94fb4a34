use std::sync::Arc;

use crate::bus::{EventBus, Notification};
use crate::collab::Directory;
use crate::ingest::conversation_of;
use crate::models::{content_type, signature_fragment, InstantMessage, ReceiptCommand};
use crate::store::{TraceRecord, TraceStore};

/// Whether receipts for an original of this content type are tracked at all.
/// Command-ish and composite kinds have no per-message delivery status.
fn origin_is_traced(tag: u32) -> bool {
    !matches!(
        tag,
        content_type::COMMAND
            | content_type::HISTORY
            | content_type::FORWARD
            | content_type::ARRAY
            | content_type::CUSTOMIZED
            | content_type::APPLICATION
    )
}

/// Correlates delivery/read receipts back to the original message rows so
/// the UI can show per-message status.
pub struct ReceiptTracker {
    traces: Arc<TraceStore>,
    directory: Arc<dyn Directory>,
    bus: EventBus,
}

impl ReceiptTracker {
    pub fn new(traces: Arc<TraceStore>, directory: Arc<dyn Directory>, bus: EventBus) -> Self {
        Self {
            traces,
            directory,
            bus,
        }
    }

    /// Persist one receipt. Untracked origin kinds are accepted as no-ops;
    /// a receipt without an origin envelope is a validation failure.
    pub async fn save_receipt(&self, message: &InstantMessage, receipt: &ReceiptCommand) -> bool {
        let Some(origin) = receipt.origin.as_ref() else {
            tracing::error!(sender = %message.envelope.sender, "receipt without origin envelope");
            return false;
        };
        if let Some(tag) = origin.type_tag {
            if !origin_is_traced(tag) {
                return true;
            }
        }

        let Some(conversation) = conversation_of(
            origin.group.as_ref(),
            &origin.sender,
            origin.receiver.as_ref(),
            self.directory.as_ref(),
        )
        .await
        else {
            tracing::error!(sender = %origin.sender, "receipt origin conversation unresolvable");
            return false;
        };

        let sn = match origin.sn {
            Some(sn) => sn,
            None => {
                tracing::error!(conversation = %conversation, "receipt origin missing sn");
                0
            }
        };
        let sig = origin
            .signature
            .as_deref()
            .map(signature_fragment)
            .unwrap_or_default();

        let trace = serde_json::json!({
            "sender": message.envelope.sender.to_string(),
            "time": message.envelope.time,
        })
        .to_string();

        let record = TraceRecord {
            conversation: conversation.clone(),
            sender: origin.sender.clone(),
            sn,
            sig_fragment: sig.clone(),
            trace,
        };
        if let Err(e) = self.traces.add_trace(&record).await {
            tracing::error!(conversation = %conversation, sn, "trace write failed: {e}");
            return false;
        }

        self.bus.publish(Notification::MessageTraced {
            conversation,
            sender: origin.sender.clone(),
            sn,
            signature: sig,
            text: receipt.text.clone(),
        });
        true
    }
}
