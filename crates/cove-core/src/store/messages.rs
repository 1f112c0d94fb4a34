use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::bus::{Action, EventBus, Notification};
use crate::config::CoreConfig;
use crate::error::StoreResult;
use crate::models::{EntityId, MessageRecord};
use crate::store::cache::CachePool;
use crate::store::db::Database;

type MessageKey = (EntityId, EntityId, u64);

fn row_to_record(row: &Row) -> rusqlite::Result<MessageRecord> {
    let cid: String = row.get("cid")?;
    let sender: String = row.get("sender")?;
    let parse = |s: &str| {
        s.parse::<EntityId>()
            .map_err(rusqlite::Error::InvalidColumnName)
    };
    Ok(MessageRecord {
        conversation: parse(&cid)?,
        sender: parse(&sender)?,
        sn: row.get::<_, i64>("sn")? as u64,
        time: row.get("time")?,
        type_tag: row.get::<_, i64>("type")? as u32,
        sig_fragment: row.get("sig")?,
        payload: row.get("payload")?,
    })
}

/// Persisted instant messages, keyed `(conversation, sender, sn)`.
pub struct MessageStore {
    db: Database,
    bus: EventBus,
    cache: CachePool<MessageKey, MessageRecord>,
}

impl MessageStore {
    pub fn new(db: Database, bus: EventBus, config: &CoreConfig) -> Arc<Self> {
        Arc::new(Self {
            db,
            bus,
            cache: CachePool::new("messages", config.cache_life, config.cache_refresh),
        })
    }

    pub async fn get_message(
        &self,
        conversation: &EntityId,
        sender: &EntityId,
        sn: u64,
    ) -> StoreResult<Option<MessageRecord>> {
        let key = (conversation.clone(), sender.clone(), sn);
        let db = self.db.clone();
        let (cid, sid) = (conversation.to_string(), sender.to_string());
        self.cache
            .load(&key, || async move {
                db.with(|conn| {
                    conn.query_row(
                        "SELECT cid, sender, sn, time, type, sig, payload
                         FROM messages WHERE cid = ?1 AND sender = ?2 AND sn = ?3",
                        params![cid, sid, sn as i64],
                        row_to_record,
                    )
                    .optional()
                })
            })
            .await
    }

    /// Upsert with the anti-regression rule.
    ///
    /// Returns `Ok(true)` when the record was inserted or updated in place,
    /// `Ok(false)` when an existing row with the same key carries a strictly
    /// newer time (stale resend; ignored).
    pub async fn save_message(&self, record: &MessageRecord) -> StoreResult<bool> {
        let key = (
            record.conversation.clone(),
            record.sender.clone(),
            record.sn,
        );
        let existing = self
            .get_message(&record.conversation, &record.sender, record.sn)
            .await?;

        let action = match existing {
            Some(old) if record.time < old.time => {
                tracing::warn!(
                    conversation = %record.conversation,
                    sender = %record.sender,
                    sn = record.sn,
                    old_time = old.time,
                    new_time = record.time,
                    "stale message resend ignored"
                );
                return Ok(false);
            }
            Some(_) => Action::Update,
            None => Action::Add,
        };

        let db = self.db.clone();
        let row = record.clone();
        self.cache
            .save(key, Some(record.clone()), || async move {
                db.with(|conn| {
                    conn.execute(
                        "INSERT INTO messages (cid, sender, sn, time, type, sig, payload)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                         ON CONFLICT(cid, sender, sn) DO UPDATE SET
                             time = excluded.time,
                             type = excluded.type,
                             sig = excluded.sig,
                             payload = excluded.payload",
                        params![
                            row.conversation.to_string(),
                            row.sender.to_string(),
                            row.sn as i64,
                            row.time,
                            row.type_tag as i64,
                            row.sig_fragment,
                            row.payload,
                        ],
                    )
                })
            })
            .await?;

        self.bus.publish(Notification::MessageUpdated {
            action,
            conversation: record.conversation.clone(),
            sender: record.sender.clone(),
            sn: record.sn,
        });
        Ok(true)
    }

    /// Messages of one conversation, newest first.
    pub async fn messages_of(
        &self,
        conversation: &EntityId,
        limit: usize,
        offset: usize,
    ) -> StoreResult<Vec<MessageRecord>> {
        let cid = conversation.to_string();
        self.db.with(|conn| {
            let mut stmt = conn.prepare(
                "SELECT cid, sender, sn, time, type, sig, payload
                 FROM messages WHERE cid = ?1
                 ORDER BY time DESC, sn DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt.query_map(params![cid, limit as i64, offset as i64], row_to_record)?;
            rows.collect()
        })
    }

    pub async fn remove_message(
        &self,
        conversation: &EntityId,
        sender: &EntityId,
        sn: u64,
    ) -> StoreResult<bool> {
        let key = (conversation.clone(), sender.clone(), sn);
        let db = self.db.clone();
        let (cid, sid) = (conversation.to_string(), sender.to_string());
        let changed: usize = self
            .cache
            .save(key, None, || async move {
                db.with(|conn| {
                    conn.execute(
                        "DELETE FROM messages WHERE cid = ?1 AND sender = ?2 AND sn = ?3",
                        params![cid, sid, sn as i64],
                    )
                })
            })
            .await?;
        if changed > 0 {
            self.bus.publish(Notification::MessageUpdated {
                action: Action::Remove,
                conversation: conversation.clone(),
                sender: sender.clone(),
                sn,
            });
        }
        Ok(changed > 0)
    }

    /// Bulk clear for one conversation (user deleted the chat).
    pub async fn clear_messages(&self, conversation: &EntityId) -> StoreResult<usize> {
        let cid = conversation.to_string();
        let removed = self
            .db
            .with(|conn| conn.execute("DELETE FROM messages WHERE cid = ?1", params![cid]))?;
        self.cache.clear();
        if removed > 0 {
            self.bus.publish(Notification::MessagesCleared {
                conversation: conversation.clone(),
            });
        }
        Ok(removed)
    }

    /// Burn sweep: drop every message strictly older than `before`, across
    /// all conversations. Returns the number of rows removed.
    pub async fn purge_before(&self, before: DateTime<Utc>) -> StoreResult<usize> {
        let cutoff = before.timestamp();
        let removed = self
            .db
            .with(|conn| conn.execute("DELETE FROM messages WHERE time < ?1", params![cutoff]))?;
        if removed > 0 {
            self.cache.clear();
            tracing::info!(removed, cutoff, "expired messages purged");
        }
        Ok(removed)
    }
}
