use std::sync::Arc;

use crate::collab::Directory;
use crate::models::EntityId;
use crate::store::{BlockListStore, MuteListStore};

/// Block/mute policy consulted before any conversation-state mutation.
///
/// A store error is logged and answered as "not blocked": a broken local
/// list must not make inbound history disappear silently.
pub struct Shield {
    directory: Arc<dyn Directory>,
    blocked: Arc<BlockListStore>,
    muted: Arc<MuteListStore>,
}

impl Shield {
    pub fn new(
        directory: Arc<dyn Directory>,
        blocked: Arc<BlockListStore>,
        muted: Arc<MuteListStore>,
    ) -> Self {
        Self {
            directory,
            blocked,
            muted,
        }
    }

    pub async fn is_blocked(&self, id: &EntityId, group: Option<&EntityId>) -> bool {
        self.listed(&self.blocked_list().await, id, group)
    }

    pub async fn is_muted(&self, id: &EntityId, group: Option<&EntityId>) -> bool {
        let Some(me) = self.directory.current_user().await else {
            return false;
        };
        let list = match self.muted.muted_of(&me).await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!("mute list unavailable: {e}");
                return false;
            }
        };
        self.listed(&list, id, group)
    }

    async fn blocked_list(&self) -> Vec<EntityId> {
        let Some(me) = self.directory.current_user().await else {
            return Vec::new();
        };
        match self.blocked.blocked_of(&me).await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!("block list unavailable: {e}");
                Vec::new()
            }
        }
    }

    fn listed(&self, list: &[EntityId], id: &EntityId, group: Option<&EntityId>) -> bool {
        list.contains(id) || group.is_some_and(|g| list.contains(g))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::config::CoreConfig;
    use crate::ingest::testing::FixedDirectory;
    use crate::store::Database;

    fn shield(directory: Arc<dyn Directory>) -> (Shield, Arc<BlockListStore>, Arc<MuteListStore>) {
        let db = Database::in_memory().unwrap();
        let bus = EventBus::new();
        let config = CoreConfig::default();
        let blocked = BlockListStore::new(db.clone(), bus.clone(), &config);
        let muted = MuteListStore::new(db, bus, &config);
        (
            Shield::new(directory, blocked.clone(), muted.clone()),
            blocked,
            muted,
        )
    }

    #[tokio::test]
    async fn test_blocked_sender() {
        let me = EntityId::user("me");
        let directory = Arc::new(FixedDirectory::new(me.clone()));
        let (shield, blocked, _) = shield(directory);

        let spammer = EntityId::user("spammer");
        assert!(!shield.is_blocked(&spammer, None).await);
        blocked.add_blocked(&me, &spammer).await.unwrap();
        assert!(shield.is_blocked(&spammer, None).await);
    }

    #[tokio::test]
    async fn test_blocked_group_blocks_any_sender() {
        let me = EntityId::user("me");
        let directory = Arc::new(FixedDirectory::new(me.clone()));
        let (shield, blocked, _) = shield(directory);

        let g = EntityId::group("noisy");
        blocked.add_blocked(&me, &g).await.unwrap();
        assert!(shield.is_blocked(&EntityId::user("anyone"), Some(&g)).await);
        assert!(!shield.is_blocked(&EntityId::user("anyone"), None).await);
    }

    #[tokio::test]
    async fn test_mute_is_independent_of_block() {
        let me = EntityId::user("me");
        let directory = Arc::new(FixedDirectory::new(me.clone()));
        let (shield, _, muted) = shield(directory);

        let chatty = EntityId::user("chatty");
        muted.add_muted(&me, &chatty).await.unwrap();
        assert!(shield.is_muted(&chatty, None).await);
        assert!(!shield.is_blocked(&chatty, None).await);
    }
}
