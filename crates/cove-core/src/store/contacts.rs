use crate::store::list::{list_store, ListKind};

list_store!(
    ContactStore,
    ListKind::Contacts,
    contacts_of,
    save_contacts,
    add_contact,
    remove_contact
);

list_store!(
    BlockListStore,
    ListKind::Blocked,
    blocked_of,
    save_blocked,
    add_blocked,
    remove_blocked
);

list_store!(
    MuteListStore,
    ListKind::Muted,
    muted_of,
    save_muted,
    add_muted,
    remove_muted
);
