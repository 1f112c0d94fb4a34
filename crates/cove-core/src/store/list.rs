use rusqlite::params;

use crate::bus::{Action, EventBus, Notification};
use crate::config::CoreConfig;
use crate::error::StoreResult;
use crate::models::EntityId;
use crate::store::cache::CachePool;
use crate::store::db::Database;

/// Symmetric difference: entries to remove (in `old`, not in `new`) and to
/// add (in `new`, not in `old`). Order within each side follows the input.
pub(crate) fn diff_lists(old: &[EntityId], new: &[EntityId]) -> (Vec<EntityId>, Vec<EntityId>) {
    let removals = old
        .iter()
        .filter(|id| !new.contains(id))
        .cloned()
        .collect();
    let additions = new
        .iter()
        .filter(|id| !old.contains(id))
        .cloned()
        .collect();
    (removals, additions)
}

/// Which id-list table a [`ListStore`] manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListKind {
    Contacts,
    Blocked,
    Muted,
    Members,
    Admins,
}

impl ListKind {
    fn table(&self) -> &'static str {
        match self {
            ListKind::Contacts => "contacts",
            ListKind::Blocked => "blocked",
            ListKind::Muted => "muted",
            ListKind::Members => "members",
            ListKind::Admins => "admins",
        }
    }

    fn owner_col(&self) -> &'static str {
        match self {
            ListKind::Members | ListKind::Admins => "gid",
            _ => "user",
        }
    }

    fn entry_col(&self) -> &'static str {
        match self {
            ListKind::Contacts => "contact",
            ListKind::Blocked | ListKind::Muted => "entry",
            ListKind::Members => "member",
            ListKind::Admins => "admin",
        }
    }

    fn notification(
        &self,
        action: Action,
        owner: EntityId,
        entry: Option<EntityId>,
    ) -> Notification {
        match self {
            ListKind::Contacts => Notification::ContactsUpdated {
                action,
                user: owner,
                contact: entry,
            },
            ListKind::Blocked => Notification::BlockListUpdated {
                action,
                user: owner,
                entry,
            },
            ListKind::Muted => Notification::MuteListUpdated {
                action,
                user: owner,
                entry,
            },
            ListKind::Members => Notification::MembersUpdated {
                action,
                group: owner,
            },
            ListKind::Admins => Notification::AdminsUpdated {
                action,
                group: owner,
            },
        }
    }
}

/// Owner-keyed id list (contacts of a user, members of a group, ...) with
/// cache-first reads and differential save.
pub(crate) struct ListStore {
    kind: ListKind,
    db: Database,
    bus: EventBus,
    cache: CachePool<EntityId, Vec<EntityId>>,
}

impl ListStore {
    pub(crate) fn new(kind: ListKind, db: Database, bus: EventBus, config: &CoreConfig) -> Self {
        Self {
            kind,
            db,
            bus,
            cache: CachePool::new(kind.table(), config.cache_life, config.cache_refresh),
        }
    }

    /// The stored list for `owner`; empty when nothing is stored.
    pub(crate) async fn entries_of(&self, owner: &EntityId) -> StoreResult<Vec<EntityId>> {
        let db = self.db.clone();
        let kind = self.kind;
        let key = owner.to_string();
        let cached = self
            .cache
            .load(owner, || async move {
                let sql = format!(
                    "SELECT {} FROM {} WHERE {} = ?1",
                    kind.entry_col(),
                    kind.table(),
                    kind.owner_col()
                );
                let list = db.with(|conn| {
                    let mut stmt = conn.prepare(&sql)?;
                    let rows = stmt.query_map(params![key], |row| {
                        let s: String = row.get(0)?;
                        s.parse::<EntityId>()
                            .map_err(rusqlite::Error::InvalidColumnName)
                    })?;
                    rows.collect::<rusqlite::Result<Vec<_>>>()
                })?;
                // An empty list is still a live entry; no point re-querying.
                Ok(Some(list))
            })
            .await?;
        Ok(cached.unwrap_or_default())
    }

    pub(crate) async fn add_entry(&self, owner: &EntityId, entry: &EntityId) -> StoreResult<bool> {
        let mut list = self.entries_of(owner).await?;
        if list.contains(entry) {
            return Ok(true);
        }
        list.push(entry.clone());
        let db = self.db.clone();
        let kind = self.kind;
        let (key, value) = (owner.to_string(), entry.to_string());
        self.cache
            .save(owner.clone(), Some(list), || async move {
                let sql = format!(
                    "INSERT OR IGNORE INTO {} ({}, {}) VALUES (?1, ?2)",
                    kind.table(),
                    kind.owner_col(),
                    kind.entry_col()
                );
                db.with(|conn| conn.execute(&sql, params![key, value]))
            })
            .await?;
        self.bus.publish(
            self.kind
                .notification(Action::Add, owner.clone(), Some(entry.clone())),
        );
        Ok(true)
    }

    pub(crate) async fn remove_entry(
        &self,
        owner: &EntityId,
        entry: &EntityId,
    ) -> StoreResult<bool> {
        let mut list = self.entries_of(owner).await?;
        let Some(pos) = list.iter().position(|id| id == entry) else {
            return Ok(true);
        };
        list.remove(pos);
        let db = self.db.clone();
        let kind = self.kind;
        let (key, value) = (owner.to_string(), entry.to_string());
        self.cache
            .save(owner.clone(), Some(list), || async move {
                let sql = format!(
                    "DELETE FROM {} WHERE {} = ?1 AND {} = ?2",
                    kind.table(),
                    kind.owner_col(),
                    kind.entry_col()
                );
                db.with(|conn| conn.execute(&sql, params![key, value]))
            })
            .await?;
        self.bus.publish(
            self.kind
                .notification(Action::Remove, owner.clone(), Some(entry.clone())),
        );
        Ok(true)
    }

    /// Differential save: apply only the delta against the stored list, one
    /// write per changed entry. The first failing write aborts the rest;
    /// writes already applied stay applied (no rollback). Returns whether
    /// every delta write succeeded.
    pub(crate) async fn save_entries(
        &self,
        owner: &EntityId,
        new_list: &[EntityId],
    ) -> StoreResult<bool> {
        let old = self.entries_of(owner).await?;
        let (removals, additions) = diff_lists(&old, new_list);
        if removals.is_empty() && additions.is_empty() {
            return Ok(true);
        }
        for entry in &removals {
            if let Err(e) = self.remove_entry(owner, entry).await {
                tracing::error!(table = self.kind.table(), owner = %owner, entry = %entry,
                    "delta remove failed: {e}");
                self.cache.invalidate(owner);
                return Ok(false);
            }
        }
        for entry in &additions {
            if let Err(e) = self.add_entry(owner, entry).await {
                tracing::error!(table = self.kind.table(), owner = %owner, entry = %entry,
                    "delta add failed: {e}");
                self.cache.invalidate(owner);
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Declare a public store with domain-named wrappers over [`ListStore`].
macro_rules! list_store {
    ($name:ident, $kind:expr, $get:ident, $save:ident, $add:ident, $remove:ident) => {
        pub struct $name {
            inner: crate::store::list::ListStore,
        }

        impl $name {
            pub fn new(
                db: crate::store::db::Database,
                bus: crate::bus::EventBus,
                config: &crate::config::CoreConfig,
            ) -> std::sync::Arc<Self> {
                std::sync::Arc::new(Self {
                    inner: crate::store::list::ListStore::new($kind, db, bus, config),
                })
            }

            pub async fn $get(
                &self,
                owner: &crate::models::EntityId,
            ) -> crate::error::StoreResult<Vec<crate::models::EntityId>> {
                self.inner.entries_of(owner).await
            }

            pub async fn $save(
                &self,
                owner: &crate::models::EntityId,
                list: &[crate::models::EntityId],
            ) -> crate::error::StoreResult<bool> {
                self.inner.save_entries(owner, list).await
            }

            pub async fn $add(
                &self,
                owner: &crate::models::EntityId,
                entry: &crate::models::EntityId,
            ) -> crate::error::StoreResult<bool> {
                self.inner.add_entry(owner, entry).await
            }

            pub async fn $remove(
                &self,
                owner: &crate::models::EntityId,
                entry: &crate::models::EntityId,
            ) -> crate::error::StoreResult<bool> {
                self.inner.remove_entry(owner, entry).await
            }
        }
    };
}

pub(crate) use list_store;
