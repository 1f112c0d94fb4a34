pub mod aggregator;
mod preview;
pub mod receipts;
pub mod shield;
#[cfg(test)]
pub(crate) mod testing;
pub mod vestibule;

pub use aggregator::{Aggregator, DefaultHiddenPolicy, HiddenPolicy};
pub use receipts::ReceiptTracker;
pub use shield::Shield;
pub use vestibule::Vestibule;

use crate::collab::Directory;
use crate::models::EntityId;

/// Derive the conversation a message belongs to: the group when there is
/// one, else a group receiver, else the counterpart of the local user.
/// `None` when nothing resolves (e.g. no local user for a direct message).
pub(crate) async fn conversation_of(
    group: Option<&EntityId>,
    sender: &EntityId,
    receiver: Option<&EntityId>,
    directory: &dyn Directory,
) -> Option<EntityId> {
    if let Some(group) = group {
        return Some(group.clone());
    }
    if let Some(receiver) = receiver {
        if receiver.is_group() {
            return Some(receiver.clone());
        }
    }
    let me = directory.current_user().await?;
    if sender == &me {
        receiver.cloned()
    } else {
        Some(sender.clone())
    }
}
