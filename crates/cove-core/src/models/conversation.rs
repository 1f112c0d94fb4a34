use serde::{Deserialize, Serialize};

use super::id::EntityId;

/// Aggregate record of one chat thread (direct or group).
///
/// `unread` and `mention_sn` only return to zero through an explicit clear
/// (or the open-binding reset); every other path adds non-negative deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: EntityId,
    pub unread: u32,
    /// Short display text of the newest message, already formatted.
    pub preview: Option<String>,
    /// Time of the newest message folded into this record (seconds).
    pub last_time: Option<i64>,
    /// Sequence number of the newest message mentioning the local user;
    /// zero means no outstanding mention.
    pub mention_sn: u64,
}

impl Conversation {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            unread: 0,
            preview: None,
            last_time: None,
            mention_sn: 0,
        }
    }
}
