//! In-memory collaborator fakes shared by the ingest tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::collab::{Directory, Messenger};
use crate::models::{Content, EntityId, InstantMessage, ReliableMessage};

/// Scriptable identity resolver. Everything is explicit: names, keys,
/// bulletins, owners and rosters are only "resolvable" after a set_ call.
pub(crate) struct FixedDirectory {
    me: EntityId,
    names: Mutex<HashMap<EntityId, String>>,
    contacts: Mutex<Vec<EntityId>>,
    keys: Mutex<HashSet<EntityId>>,
    bulletins: Mutex<HashSet<EntityId>>,
    owners: Mutex<HashMap<EntityId, EntityId>>,
    members: Mutex<HashMap<EntityId, Vec<EntityId>>>,
}

impl FixedDirectory {
    pub(crate) fn new(me: EntityId) -> Self {
        Self {
            me,
            names: Mutex::new(HashMap::new()),
            contacts: Mutex::new(Vec::new()),
            keys: Mutex::new(HashSet::new()),
            bulletins: Mutex::new(HashSet::new()),
            owners: Mutex::new(HashMap::new()),
            members: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn set_name(&self, id: &EntityId, name: &str) {
        self.names.lock().insert(id.clone(), name.to_string());
    }

    pub(crate) fn add_key(&self, user: &EntityId) {
        self.keys.lock().insert(user.clone());
    }

    pub(crate) fn set_members(&self, group: &EntityId, members: &[EntityId]) {
        self.members.lock().insert(group.clone(), members.to_vec());
    }

    /// Make a group fully resolvable: bulletin, owner and roster.
    pub(crate) fn set_group(&self, group: &EntityId, owner: &EntityId, members: &[EntityId]) {
        self.bulletins.lock().insert(group.clone());
        self.owners.lock().insert(group.clone(), owner.clone());
        self.set_members(group, members);
    }
}

#[async_trait]
impl Directory for FixedDirectory {
    async fn current_user(&self) -> Option<EntityId> {
        Some(self.me.clone())
    }

    async fn name_of(&self, id: &EntityId) -> String {
        self.names
            .lock()
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.address().to_string())
    }

    async fn contacts_of(&self, _user: &EntityId) -> Vec<EntityId> {
        self.contacts.lock().clone()
    }

    async fn encryption_key_exists(&self, user: &EntityId) -> bool {
        self.keys.lock().contains(user)
    }

    async fn bulletin_exists(&self, group: &EntityId) -> bool {
        self.bulletins.lock().contains(group)
    }

    async fn owner_of(&self, group: &EntityId) -> Option<EntityId> {
        self.owners.lock().get(group).cloned()
    }

    async fn members_of(&self, group: &EntityId) -> Vec<EntityId> {
        self.members.lock().get(group).cloned().unwrap_or_default()
    }
}

/// Messenger that records everything it is handed.
#[derive(Default)]
pub(crate) struct RecordingMessenger {
    pub(crate) sent_instant: Mutex<Vec<InstantMessage>>,
    pub(crate) sent_reliable: Mutex<Vec<ReliableMessage>>,
    pub(crate) processed: Mutex<Vec<ReliableMessage>>,
    /// Responses returned from every `process_reliable_message` call.
    pub(crate) responses: Mutex<Vec<ReliableMessage>>,
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_instant_message(&self, message: InstantMessage, _priority: i32) -> bool {
        self.sent_instant.lock().push(message);
        true
    }

    async fn send_reliable_message(&self, message: ReliableMessage, _priority: i32) -> bool {
        self.sent_reliable.lock().push(message);
        true
    }

    async fn process_reliable_message(&self, message: ReliableMessage) -> Vec<ReliableMessage> {
        self.processed.lock().push(message);
        self.responses.lock().clone()
    }

    async fn send_content(
        &self,
        _content: Content,
        _sender: Option<EntityId>,
        _receiver: EntityId,
        _priority: i32,
    ) -> bool {
        true
    }
}
