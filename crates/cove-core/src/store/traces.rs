use std::sync::Arc;

use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::models::EntityId;
use crate::store::db::Database;

/// One receipt correlated back to an original message. Append-only; rows are
/// never updated and pruning is owned elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub conversation: EntityId,
    /// Sender of the original message the receipt refers to.
    pub sender: EntityId,
    pub sn: u64,
    pub sig_fragment: String,
    /// Serialized delivery metadata (who confirmed, when).
    pub trace: String,
}

pub struct TraceStore {
    db: Database,
}

impl TraceStore {
    pub fn new(db: Database) -> Arc<Self> {
        Arc::new(Self { db })
    }

    pub async fn add_trace(&self, record: &TraceRecord) -> StoreResult<()> {
        let row = record.clone();
        self.db.with(|conn| {
            conn.execute(
                "INSERT INTO traces (cid, sender, sn, sig, trace)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    row.conversation.to_string(),
                    row.sender.to_string(),
                    row.sn as i64,
                    row.sig_fragment,
                    row.trace,
                ],
            )
        })?;
        Ok(())
    }

    /// All trace payloads recorded for one message, in insertion order.
    pub async fn traces_of(
        &self,
        conversation: &EntityId,
        sender: &EntityId,
        sn: u64,
    ) -> StoreResult<Vec<String>> {
        let (cid, sid) = (conversation.to_string(), sender.to_string());
        self.db.with(|conn| {
            let mut stmt = conn.prepare(
                "SELECT trace FROM traces
                 WHERE cid = ?1 AND sender = ?2 AND sn = ?3
                 ORDER BY rowid",
            )?;
            let rows = stmt.query_map(params![cid, sid, sn as i64], |row| row.get(0))?;
            rows.collect()
        })
    }
}
