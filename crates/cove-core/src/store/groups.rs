use crate::store::list::{list_store, ListKind};

list_store!(
    MemberStore,
    ListKind::Members,
    members_of,
    save_members,
    add_member,
    remove_member
);

list_store!(
    AdminStore,
    ListKind::Admins,
    admins_of,
    save_admins,
    add_admin,
    remove_admin
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{Action, EventBus, Notification};
    use crate::config::CoreConfig;
    use crate::models::EntityId;
    use crate::store::db::Database;

    fn ids(names: &[&str]) -> Vec<EntityId> {
        names.iter().map(|n| EntityId::user(*n)).collect()
    }

    #[tokio::test]
    async fn test_roster_save_and_read() {
        let store = MemberStore::new(
            Database::in_memory().unwrap(),
            EventBus::new(),
            &CoreConfig::default(),
        );
        let g = EntityId::group("g1");
        assert!(store.save_members(&g, &ids(&["alice", "bob"])).await.unwrap());
        let mut got = store.members_of(&g).await.unwrap();
        got.sort();
        assert_eq!(got, ids(&["alice", "bob"]));
    }

    #[tokio::test]
    async fn test_reset_roster_applies_delta() {
        let store = MemberStore::new(
            Database::in_memory().unwrap(),
            EventBus::new(),
            &CoreConfig::default(),
        );
        let g = EntityId::group("g1");
        store.save_members(&g, &ids(&["alice", "bob"])).await.unwrap();
        store.save_members(&g, &ids(&["bob", "carol"])).await.unwrap();

        let mut got = store.members_of(&g).await.unwrap();
        got.sort();
        assert_eq!(got, ids(&["bob", "carol"]));
    }

    #[tokio::test]
    async fn test_member_change_broadcasts_group_id() {
        let db = Database::in_memory().unwrap();
        let bus = EventBus::new();
        let store = MemberStore::new(db, bus.clone(), &CoreConfig::default());
        let mut rx = bus.subscribe();

        let g = EntityId::group("g1");
        store.add_member(&g, &EntityId::user("alice")).await.unwrap();

        match rx.recv().await.unwrap() {
            Notification::MembersUpdated { action, group } => {
                assert_eq!(action, Action::Add);
                assert_eq!(group, g);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_admins_separate_from_members() {
        let db = Database::in_memory().unwrap();
        let bus = EventBus::new();
        let config = CoreConfig::default();
        let members = MemberStore::new(db.clone(), bus.clone(), &config);
        let admins = AdminStore::new(db, bus, &config);
        let g = EntityId::group("g1");

        members.save_members(&g, &ids(&["alice", "bob"])).await.unwrap();
        admins.save_admins(&g, &ids(&["alice"])).await.unwrap();

        assert_eq!(admins.admins_of(&g).await.unwrap(), ids(&["alice"]));
        assert_eq!(members.members_of(&g).await.unwrap().len(), 2);
    }
}
