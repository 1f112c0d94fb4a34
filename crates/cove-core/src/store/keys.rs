use std::sync::Arc;

use rusqlite::{params, OptionalExtension};

use crate::bus::{EventBus, Notification};
use crate::config::CoreConfig;
use crate::error::StoreResult;
use crate::models::{EntityId, LoginRecord};
use crate::store::cache::CachePool;
use crate::store::db::Database;

/// Local private keys, keyed `(user, key_type)`. Key material is stored as
/// the identity layer hands it over (already wrapped/encoded there).
pub struct PrivateKeyStore {
    db: Database,
    cache: CachePool<(EntityId, String), String>,
}

impl PrivateKeyStore {
    pub fn new(db: Database, config: &CoreConfig) -> Arc<Self> {
        Arc::new(Self {
            db,
            cache: CachePool::new("private_keys", config.cache_life, config.cache_refresh),
        })
    }

    pub async fn private_key_of(
        &self,
        user: &EntityId,
        key_type: &str,
    ) -> StoreResult<Option<String>> {
        let key = (user.clone(), key_type.to_string());
        let db = self.db.clone();
        let (uid, kt) = (user.to_string(), key_type.to_string());
        self.cache
            .load(&key, || async move {
                db.with(|conn| {
                    conn.query_row(
                        "SELECT key FROM private_keys WHERE uid = ?1 AND key_type = ?2",
                        params![uid, kt],
                        |row| row.get(0),
                    )
                    .optional()
                })
            })
            .await
    }

    pub async fn save_private_key(
        &self,
        user: &EntityId,
        key_type: &str,
        key_data: &str,
    ) -> StoreResult<()> {
        let key = (user.clone(), key_type.to_string());
        let db = self.db.clone();
        let (uid, kt, data) = (
            user.to_string(),
            key_type.to_string(),
            key_data.to_string(),
        );
        self.cache
            .save(key, Some(key_data.to_string()), || async move {
                db.with(|conn| {
                    conn.execute(
                        "INSERT INTO private_keys (uid, key_type, key, time)
                         VALUES (?1, ?2, ?3, strftime('%s','now'))
                         ON CONFLICT(uid, key_type) DO UPDATE SET
                             key = excluded.key,
                             time = excluded.time",
                        params![uid, kt, data],
                    )
                })
            })
            .await?;
        Ok(())
    }
}

/// Last-login bookkeeping per user, time-ordered like documents.
pub struct LoginStore {
    db: Database,
    bus: EventBus,
    cache: CachePool<EntityId, LoginRecord>,
}

impl LoginStore {
    pub fn new(db: Database, bus: EventBus, config: &CoreConfig) -> Arc<Self> {
        Arc::new(Self {
            db,
            bus,
            cache: CachePool::new("logins", config.cache_life, config.cache_refresh),
        })
    }

    pub async fn login_of(&self, user: &EntityId) -> StoreResult<Option<LoginRecord>> {
        let db = self.db.clone();
        let uid = user.to_string();
        self.cache
            .load(user, || async move {
                db.with(|conn| {
                    conn.query_row(
                        "SELECT uid, station, time FROM logins WHERE uid = ?1",
                        params![uid],
                        |row| {
                            let uid: String = row.get("uid")?;
                            Ok(LoginRecord {
                                user: uid
                                    .parse::<EntityId>()
                                    .map_err(rusqlite::Error::InvalidColumnName)?,
                                station: row.get("station")?,
                                time: row.get("time")?,
                            })
                        },
                    )
                    .optional()
                })
            })
            .await
    }

    /// Save with anti-regression: an older login than the stored one is
    /// ignored (`Ok(false)`).
    pub async fn save_login(&self, record: &LoginRecord) -> StoreResult<bool> {
        if let Some(old) = self.login_of(&record.user).await? {
            if record.time < old.time {
                tracing::warn!(user = %record.user, "older login record ignored");
                return Ok(false);
            }
        }
        let db = self.db.clone();
        let row = record.clone();
        self.cache
            .save(record.user.clone(), Some(record.clone()), || async move {
                db.with(|conn| {
                    conn.execute(
                        "INSERT INTO logins (uid, station, time) VALUES (?1, ?2, ?3)
                         ON CONFLICT(uid) DO UPDATE SET
                             station = excluded.station,
                             time = excluded.time",
                        params![row.user.to_string(), row.station, row.time],
                    )
                })
            })
            .await?;
        self.bus.publish(Notification::LoginSaved {
            user: record.user.clone(),
        });
        Ok(true)
    }
}
