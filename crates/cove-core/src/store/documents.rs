use std::sync::Arc;

use rusqlite::{params, OptionalExtension, Row};

use crate::bus::{EventBus, Notification};
use crate::config::CoreConfig;
use crate::error::StoreResult;
use crate::models::{Document, EntityId, Meta};
use crate::store::cache::CachePool;
use crate::store::db::Database;

fn row_to_document(row: &Row) -> rusqlite::Result<Document> {
    let did: String = row.get("did")?;
    let props: String = row.get("props")?;
    Ok(Document {
        id: did
            .parse::<EntityId>()
            .map_err(rusqlite::Error::InvalidColumnName)?,
        doc_type: row.get("doc_type")?,
        properties: serde_json::from_str(&props).unwrap_or(serde_json::Value::Null),
        signature: row.get("signature")?,
        time: row.get("time")?,
    })
}

/// Profile documents per entity, keyed `(id, doc_type)`. Writes are
/// time-ordered: an older document than the stored one is ignored.
pub struct DocumentStore {
    db: Database,
    bus: EventBus,
    cache: CachePool<(EntityId, String), Document>,
}

impl DocumentStore {
    pub fn new(db: Database, bus: EventBus, config: &CoreConfig) -> Arc<Self> {
        Arc::new(Self {
            db,
            bus,
            cache: CachePool::new("documents", config.cache_life, config.cache_refresh),
        })
    }

    pub async fn document_of(
        &self,
        id: &EntityId,
        doc_type: &str,
    ) -> StoreResult<Option<Document>> {
        let key = (id.clone(), doc_type.to_string());
        let db = self.db.clone();
        let (did, dt) = (id.to_string(), doc_type.to_string());
        self.cache
            .load(&key, || async move {
                db.with(|conn| {
                    conn.query_row(
                        "SELECT did, doc_type, props, signature, time
                         FROM documents WHERE did = ?1 AND doc_type = ?2",
                        params![did, dt],
                        row_to_document,
                    )
                    .optional()
                })
            })
            .await
    }

    /// Save with anti-regression: a document strictly older than the stored
    /// one for the same `(id, doc_type)` is a no-op returning `false`.
    pub async fn save_document(&self, document: &Document) -> StoreResult<bool> {
        if let Some(old) = self.document_of(&document.id, &document.doc_type).await? {
            if document.time < old.time {
                tracing::warn!(id = %document.id, doc_type = %document.doc_type,
                    old_time = old.time, new_time = document.time,
                    "older document ignored");
                return Ok(false);
            }
        }
        let key = (document.id.clone(), document.doc_type.clone());
        let db = self.db.clone();
        let row = document.clone();
        let props = serde_json::to_string(&document.properties)?;
        self.cache
            .save(key, Some(document.clone()), || async move {
                db.with(|conn| {
                    conn.execute(
                        "INSERT INTO documents (did, doc_type, props, signature, time)
                         VALUES (?1, ?2, ?3, ?4, ?5)
                         ON CONFLICT(did, doc_type) DO UPDATE SET
                             props = excluded.props,
                             signature = excluded.signature,
                             time = excluded.time",
                        params![row.id.to_string(), row.doc_type, props, row.signature, row.time],
                    )
                })
            })
            .await?;
        self.bus.publish(Notification::DocumentUpdated {
            id: document.id.clone(),
        });
        Ok(true)
    }
}

/// Identity metas. Effectively immutable: the first stored meta for an id
/// wins; an equal-or-newer duplicate is accepted as a no-op.
pub struct MetaStore {
    db: Database,
    bus: EventBus,
    cache: CachePool<EntityId, Meta>,
}

impl MetaStore {
    pub fn new(db: Database, bus: EventBus, config: &CoreConfig) -> Arc<Self> {
        Arc::new(Self {
            db,
            bus,
            cache: CachePool::new("metas", config.cache_life, config.cache_refresh),
        })
    }

    pub async fn meta_of(&self, id: &EntityId) -> StoreResult<Option<Meta>> {
        let db = self.db.clone();
        let mid = id.to_string();
        self.cache
            .load(id, || async move {
                db.with(|conn| {
                    conn.query_row(
                        "SELECT mid, public_key, time FROM metas WHERE mid = ?1",
                        params![mid],
                        |row| {
                            let mid: String = row.get("mid")?;
                            Ok(Meta {
                                id: mid
                                    .parse::<EntityId>()
                                    .map_err(rusqlite::Error::InvalidColumnName)?,
                                public_key: row.get("public_key")?,
                                time: row.get("time")?,
                            })
                        },
                    )
                    .optional()
                })
            })
            .await
    }

    pub async fn save_meta(&self, meta: &Meta) -> StoreResult<bool> {
        if let Some(old) = self.meta_of(&meta.id).await? {
            if meta.time < old.time {
                tracing::warn!(id = %meta.id, "older meta ignored");
                return Ok(false);
            }
            // Meta is immutable; same-or-newer duplicate changes nothing.
            return Ok(true);
        }
        let db = self.db.clone();
        let row = meta.clone();
        self.cache
            .save(meta.id.clone(), Some(meta.clone()), || async move {
                db.with(|conn| {
                    conn.execute(
                        "INSERT OR IGNORE INTO metas (mid, public_key, time) VALUES (?1, ?2, ?3)",
                        params![row.id.to_string(), row.public_key, row.time],
                    )
                })
            })
            .await?;
        self.bus.publish(Notification::MetaSaved {
            id: meta.id.clone(),
        });
        Ok(true)
    }
}
