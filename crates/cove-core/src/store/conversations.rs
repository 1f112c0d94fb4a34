use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use rusqlite::{params, OptionalExtension, Row};
use tokio::sync::{Mutex, MutexGuard};

use crate::bus::{Action, EventBus, Notification};
use crate::config::CoreConfig;
use crate::error::StoreResult;
use crate::models::{Conversation, EntityId, InstantMessage};
use crate::store::cache::CachePool;
use crate::store::db::Database;

fn row_to_conversation(row: &Row) -> rusqlite::Result<Conversation> {
    let cid: String = row.get("cid")?;
    let id = cid
        .parse::<EntityId>()
        .map_err(rusqlite::Error::InvalidColumnName)?;
    Ok(Conversation {
        id,
        unread: row.get::<_, i64>("unread")?.max(0) as u32,
        preview: row.get("preview")?,
        last_time: row.get("last_time")?,
        mention_sn: row.get::<_, i64>("mention_sn")?.max(0) as u64,
    })
}

/// Conversation aggregate store: persisted rows plus the open/closed UI
/// binding (runtime-only) and a read-through cache.
pub struct ConversationStore {
    db: Database,
    bus: EventBus,
    cache: CachePool<EntityId, Conversation>,
    /// Conversations currently bound to a visible chat window.
    open: RwLock<HashSet<EntityId>>,
    /// Guards compound read-modify-write sequences (aggregate folding).
    write_lock: Mutex<()>,
}

impl ConversationStore {
    pub fn new(db: Database, bus: EventBus, config: &CoreConfig) -> Arc<Self> {
        Arc::new(Self {
            db,
            bus,
            cache: CachePool::new("conversations", config.cache_life, config.cache_refresh),
            open: RwLock::new(HashSet::new()),
            write_lock: Mutex::new(()),
        })
    }

    /// Acquire the compound-mutation lock. Callers doing get-then-save (the
    /// aggregator) hold this across the whole sequence.
    pub async fn lock_for_update(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    pub async fn get_conversation(&self, id: &EntityId) -> StoreResult<Option<Conversation>> {
        let db = self.db.clone();
        let key = id.to_string();
        self.cache
            .load(id, || async move {
                db.with(|conn| {
                    conn.query_row(
                        "SELECT cid, unread, preview, last_time, mention_sn
                         FROM conversations WHERE cid = ?1",
                        params![key],
                        row_to_conversation,
                    )
                    .optional()
                })
            })
            .await
    }

    /// All conversations, newest last-message first.
    pub async fn all_conversations(&self) -> StoreResult<Vec<Conversation>> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(
                "SELECT cid, unread, preview, last_time, mention_sn
                 FROM conversations
                 ORDER BY last_time IS NULL, last_time DESC",
            )?;
            let rows = stmt.query_map([], row_to_conversation)?;
            rows.collect()
        })
    }

    async fn persist(&self, conversation: &Conversation) -> StoreResult<()> {
        let db = self.db.clone();
        let row = conversation.clone();
        self.cache
            .save(conversation.id.clone(), Some(conversation.clone()), || async move {
                db.with(|conn| {
                    conn.execute(
                        "INSERT INTO conversations (cid, unread, preview, last_time, mention_sn)
                         VALUES (?1, ?2, ?3, ?4, ?5)
                         ON CONFLICT(cid) DO UPDATE SET
                             unread = excluded.unread,
                             preview = excluded.preview,
                             last_time = excluded.last_time,
                             mention_sn = excluded.mention_sn",
                        params![
                            row.id.to_string(),
                            row.unread as i64,
                            row.preview,
                            row.last_time,
                            row.mention_sn as i64,
                        ],
                    )
                })
            })
            .await?;
        Ok(())
    }

    /// Insert or replace the record and broadcast the change.
    pub async fn save_conversation(&self, conversation: &Conversation) -> StoreResult<()> {
        let existed = self.get_conversation(&conversation.id).await?.is_some();
        self.persist(conversation).await?;
        self.notify(
            if existed { Action::Update } else { Action::Add },
            conversation.id.clone(),
            None,
        );
        Ok(())
    }

    /// Like [`save_conversation`], but attaches the message that caused the
    /// update to the notification.
    pub async fn save_updated(
        &self,
        conversation: &Conversation,
        action: Action,
        message: &InstantMessage,
    ) -> StoreResult<()> {
        self.persist(conversation).await?;
        self.notify(action, conversation.id.clone(), Some(message.clone()));
        Ok(())
    }

    /// Drop the record. The caller owns clearing the message rows.
    pub async fn remove_conversation(&self, id: &EntityId) -> StoreResult<bool> {
        let db = self.db.clone();
        let key = id.to_string();
        let changed: usize = self
            .cache
            .save(id.clone(), None, || async move {
                db.with(|conn| conn.execute("DELETE FROM conversations WHERE cid = ?1", params![key]))
            })
            .await?;
        if changed > 0 {
            self.notify(Action::Remove, id.clone(), None);
        }
        Ok(changed > 0)
    }

    /// Explicit mark-read: unread and mention return to zero, nothing else
    /// changes.
    pub async fn clear_unread(&self, id: &EntityId) -> StoreResult<bool> {
        let _guard = self.lock_for_update().await;
        let Some(mut conversation) = self.get_conversation(id).await? else {
            return Ok(false);
        };
        if conversation.unread == 0 && conversation.mention_sn == 0 {
            return Ok(true);
        }
        conversation.unread = 0;
        conversation.mention_sn = 0;
        let db = self.db.clone();
        let key = id.to_string();
        self.cache
            .save(id.clone(), Some(conversation), || async move {
                db.with(|conn| {
                    conn.execute(
                        "UPDATE conversations SET unread = 0, mention_sn = 0 WHERE cid = ?1",
                        params![key],
                    )
                })
            })
            .await?;
        self.notify(Action::Update, id.clone(), None);
        Ok(true)
    }

    /// Bind/unbind a visible chat window. While open, incoming messages do
    /// not accumulate unread.
    pub fn set_open(&self, id: &EntityId, open: bool) {
        let mut set = self.open.write();
        if open {
            set.insert(id.clone());
        } else {
            set.remove(id);
        }
    }

    pub fn is_open(&self, id: &EntityId) -> bool {
        self.open.read().contains(id)
    }

    fn notify(&self, action: Action, id: EntityId, message: Option<InstantMessage>) {
        self.bus.publish(Notification::ConversationUpdated {
            action,
            id,
            message,
        });
    }
}
