use std::sync::Arc;

use crate::bus::Action;
use crate::collab::Directory;
use crate::config::CoreConfig;
use crate::ingest::conversation_of;
use crate::ingest::preview::{preview_text, scan_mention};
use crate::ingest::receipts::ReceiptTracker;
use crate::ingest::shield::Shield;
use crate::models::{
    Command, Content, ContentBody, Conversation, EntityId, InstantMessage, MessageRecord,
};
use crate::store::{ConversationStore, MessageStore};

/// Decides whether a content may touch the conversation aggregate at all.
/// The default policy hides commands and system chatter; apps can narrow or
/// widen it.
pub trait HiddenPolicy: Send + Sync {
    fn is_hidden(&self, content: &Content, local_is_member: bool) -> bool;
}

/// Text receipts some stations send in-band; they never reach the
/// conversation list.
const SYSTEM_RECEIPT_PREFIXES: &[&str] =
    &["Message received", "Message sent", "Document received"];

pub struct DefaultHiddenPolicy;

impl HiddenPolicy for DefaultHiddenPolicy {
    fn is_hidden(&self, content: &Content, local_is_member: bool) -> bool {
        if content.hidden {
            return true;
        }
        match &content.body {
            // Roster changes are only shown to current members; an outsider
            // (e.g. just expelled) must not see the churn.
            ContentBody::Command(Command::Group(gc)) => gc.is_lifecycle() && !local_is_member,
            ContentBody::Command(_) => true,
            ContentBody::Text { text } => SYSTEM_RECEIPT_PREFIXES
                .iter()
                .any(|prefix| text.starts_with(prefix)),
            _ => false,
        }
    }
}

/// Single entry point for turning a decoded message into persisted state:
/// message row first, conversation aggregate second, in that order.
pub struct Aggregator {
    conversations: Arc<ConversationStore>,
    messages: Arc<MessageStore>,
    receipts: ReceiptTracker,
    shield: Shield,
    directory: Arc<dyn Directory>,
    hidden: Box<dyn HiddenPolicy>,
    system_apps: Vec<String>,
}

impl Aggregator {
    pub fn new(
        conversations: Arc<ConversationStore>,
        messages: Arc<MessageStore>,
        receipts: ReceiptTracker,
        shield: Shield,
        directory: Arc<dyn Directory>,
        config: &CoreConfig,
    ) -> Self {
        Self {
            conversations,
            messages,
            receipts,
            shield,
            directory,
            hidden: Box::new(DefaultHiddenPolicy),
            system_apps: config.system_apps.clone(),
        }
    }

    pub fn with_hidden_policy(mut self, policy: Box<dyn HiddenPolicy>) -> Self {
        self.hidden = policy;
        self
    }

    /// Content kinds handled by dedicated command processors elsewhere are
    /// accepted without storing anything.
    fn needs_store(&self, content: &Content) -> bool {
        match &content.body {
            ContentBody::Command(Command::Group(_)) => true,
            ContentBody::Command(_) => false,
            ContentBody::Forward { .. } => false,
            ContentBody::Custom { app, .. } => !self.system_apps.iter().any(|a| a == app),
            _ => true,
        }
    }

    /// Persist a decoded message and fold it into its conversation.
    ///
    /// Returns false on any persistence failure; steps already applied stay
    /// applied (client-local cache, rebuildable from message storage).
    pub async fn save_instant_message(&self, message: &InstantMessage) -> bool {
        if let ContentBody::Command(Command::Receipt(receipt)) = &message.content.body {
            return self.receipts.save_receipt(message, receipt).await;
        }
        if !self.needs_store(&message.content) {
            return true;
        }

        let Some(conversation) = conversation_of(
            message.content.group.as_ref(),
            &message.envelope.sender,
            Some(&message.envelope.receiver),
            self.directory.as_ref(),
        )
        .await
        else {
            tracing::error!(sender = %message.envelope.sender,
                receiver = %message.envelope.receiver,
                "conversation id unresolvable");
            return false;
        };

        let record = match MessageRecord::from_instant(conversation.clone(), message) {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(conversation = %conversation, "unstorable message: {e}");
                return false;
            }
        };
        match self.messages.save_message(&record).await {
            Ok(true) => {}
            Ok(false) => return false, // stale resend
            Err(e) => {
                tracing::error!(conversation = %conversation, "message write failed: {e}");
                return false;
            }
        }

        // Only a successfully persisted message may touch the aggregate.
        self.update_conversation(&conversation, message).await
    }

    /// Delete a conversation together with its messages.
    pub async fn remove_conversation(&self, id: &EntityId) -> bool {
        if let Err(e) = self.messages.clear_messages(id).await {
            tracing::error!(conversation = %id, "clearing messages failed: {e}");
            return false;
        }
        match self.conversations.remove_conversation(id).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(conversation = %id, "removing conversation failed: {e}");
                false
            }
        }
    }

    async fn update_conversation(&self, conversation: &EntityId, message: &InstantMessage) -> bool {
        let sender = &message.envelope.sender;
        let group = message.content.group.as_ref();

        if self.shield.is_blocked(sender, group).await {
            tracing::info!(sender = %sender, conversation = %conversation,
                "blocked sender; aggregate untouched");
            return true;
        }

        let me = self.directory.current_user().await;
        let local_is_member = match (group, me.as_ref()) {
            (Some(g), Some(me)) => self.directory.members_of(g).await.contains(me),
            _ => true,
        };
        if self.hidden.is_hidden(&message.content, local_is_member) {
            return true;
        }

        let sender_is_me = me.as_ref() == Some(sender);
        let mut preview = preview_text(&message.content, sender, self.directory.as_ref()).await;
        if conversation.is_group() && !sender_is_me {
            let name = self.directory.name_of(sender).await;
            preview = format!("{name}: {preview}");
        }

        let muted = message.muted || message.content.muted;
        let delta: u32 = if sender_is_me || message.content.is_command() || muted {
            0
        } else {
            1
        };
        let mention = match &message.content.body {
            ContentBody::Text { text } => {
                let nickname = match me.as_ref() {
                    Some(me) => self.directory.name_of(me).await,
                    None => String::new(),
                };
                scan_mention(text, &nickname, message.content.sn)
            }
            _ => 0,
        };
        let msg_time = message.content.time.unwrap_or(message.envelope.time);

        // Compound read-modify-write; the store lock keeps concurrent folds
        // from clobbering each other.
        let _guard = self.conversations.lock_for_update().await;
        let existing = match self.conversations.get_conversation(conversation).await {
            Ok(existing) => existing,
            Err(e) => {
                tracing::error!(conversation = %conversation, "conversation read failed: {e}");
                return false;
            }
        };

        let (record, action) = match existing {
            None => {
                let mut record = Conversation::new(conversation.clone());
                record.unread = delta;
                record.preview = Some(preview);
                record.last_time = Some(msg_time);
                record.mention_sn = mention;
                (record, Action::Add)
            }
            Some(mut record) => {
                if record.last_time.is_some_and(|t| msg_time <= t) {
                    // Out-of-order or duplicate fold; the aggregate already
                    // reflects a newer message.
                    tracing::debug!(conversation = %conversation, msg_time,
                        "aggregate unchanged for out-of-order message");
                    return true;
                }
                if self.conversations.is_open(conversation) {
                    // Bound to a visible window: the user is looking at it.
                    record.unread = 0;
                    record.mention_sn = 0;
                } else {
                    record.unread += delta;
                    if mention > 0 {
                        record.mention_sn = mention;
                    }
                }
                record.preview = Some(preview);
                record.last_time = Some(msg_time);
                (record, Action::Update)
            }
        };

        if let Err(e) = self.conversations.save_updated(&record, action, message).await {
            tracing::error!(conversation = %conversation, "conversation write failed: {e}");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::ingest::testing::FixedDirectory;
    use crate::models::{Envelope, GroupCommand};
    use crate::store::{
        BlockListStore, Database, MuteListStore, TraceStore,
    };

    struct Harness {
        db: Database,
        directory: Arc<FixedDirectory>,
        conversations: Arc<ConversationStore>,
        messages: Arc<MessageStore>,
        blocked: Arc<BlockListStore>,
        aggregator: Aggregator,
    }

    fn me() -> EntityId {
        EntityId::user("me")
    }

    fn harness() -> Harness {
        let db = Database::in_memory().unwrap();
        let bus = EventBus::new();
        let config = CoreConfig::default();
        let directory = Arc::new(FixedDirectory::new(me()));
        directory.set_name(&me(), "Me");

        let conversations = ConversationStore::new(db.clone(), bus.clone(), &config);
        let messages = MessageStore::new(db.clone(), bus.clone(), &config);
        let blocked = BlockListStore::new(db.clone(), bus.clone(), &config);
        let muted = MuteListStore::new(db.clone(), bus.clone(), &config);
        let traces = TraceStore::new(db.clone());

        let shield = Shield::new(directory.clone(), blocked.clone(), muted);
        let receipts = ReceiptTracker::new(traces, directory.clone(), bus.clone());
        let aggregator = Aggregator::new(
            conversations.clone(),
            messages.clone(),
            receipts,
            shield,
            directory.clone(),
            &config,
        );
        Harness {
            db,
            directory,
            conversations,
            messages,
            blocked,
            aggregator,
        }
    }

    fn group_text(from: &str, group: &str, sn: u64, time: i64, text: &str) -> InstantMessage {
        let g = EntityId::group(group);
        let env = Envelope::new(EntityId::user(from), g.clone(), time);
        let content = Content::text(sn, text).with_group(g);
        InstantMessage::new(env, content)
    }

    fn direct_text(from: &str, to: &str, sn: u64, time: i64, text: &str) -> InstantMessage {
        let env = Envelope::new(EntityId::user(from), EntityId::user(to), time);
        InstantMessage::new(env, Content::text(sn, text))
    }

    #[tokio::test]
    async fn test_group_message_creates_conversation_with_prefix() {
        // Scenario: first message from a member lands in a fresh group chat.
        let h = harness();
        let g1 = EntityId::group("g1");
        h.directory
            .set_group(&g1, &EntityId::user("owner"), &[EntityId::user("u1"), me()]);
        h.directory.set_name(&EntityId::user("u1"), "Uma");

        let msg = group_text("u1", "g1", 5, 100, "hello group");
        assert!(h.aggregator.save_instant_message(&msg).await);

        let row = h
            .messages
            .get_message(&g1, &EntityId::user("u1"), 5)
            .await
            .unwrap();
        assert!(row.is_some(), "message row must be inserted");

        let conv = h.conversations.get_conversation(&g1).await.unwrap().unwrap();
        assert_eq!(conv.preview.as_deref(), Some("Uma: hello group"));
        assert_eq!(conv.unread, 1);
        assert_eq!(conv.last_time, Some(100));
    }

    #[tokio::test]
    async fn test_open_conversation_does_not_accumulate_unread() {
        let h = harness();
        let g1 = EntityId::group("g1");
        h.directory
            .set_group(&g1, &EntityId::user("owner"), &[EntityId::user("u1"), me()]);

        assert!(h
            .aggregator
            .save_instant_message(&group_text("u1", "g1", 1, 100, "a"))
            .await);
        h.conversations.set_open(&g1, true);
        assert!(h
            .aggregator
            .save_instant_message(&group_text("u1", "g1", 2, 110, "b"))
            .await);

        let conv = h.conversations.get_conversation(&g1).await.unwrap().unwrap();
        assert_eq!(conv.unread, 0, "open binding resets unread");
        assert_eq!(conv.last_time, Some(110));
    }

    #[tokio::test]
    async fn test_stale_resend_changes_nothing() {
        // Scenario: the same (conversation, sender, sn) arrives again with
        // an earlier time.
        let h = harness();
        let g1 = EntityId::group("g1");
        h.directory
            .set_group(&g1, &EntityId::user("owner"), &[EntityId::user("u1"), me()]);

        assert!(h
            .aggregator
            .save_instant_message(&group_text("u1", "g1", 5, 100, "first"))
            .await);
        let before = h.conversations.get_conversation(&g1).await.unwrap().unwrap();

        assert!(
            !h.aggregator
                .save_instant_message(&group_text("u1", "g1", 5, 90, "stale"))
                .await,
            "stale upsert must report failure"
        );

        let after = h.conversations.get_conversation(&g1).await.unwrap().unwrap();
        assert_eq!(after, before, "conversation state must be unchanged");
        let row = h
            .messages
            .get_message(&g1, &EntityId::user("u1"), 5)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.time, 100);
    }

    #[tokio::test]
    async fn test_identical_resend_is_idempotent() {
        let h = harness();
        let g1 = EntityId::group("g1");
        h.directory
            .set_group(&g1, &EntityId::user("owner"), &[EntityId::user("u1"), me()]);

        let msg = group_text("u1", "g1", 5, 100, "hello");
        assert!(h.aggregator.save_instant_message(&msg).await);
        assert!(h.aggregator.save_instant_message(&msg).await);

        let rows = h.messages.messages_of(&g1, 10, 0).await.unwrap();
        assert_eq!(rows.len(), 1);
        let conv = h.conversations.get_conversation(&g1).await.unwrap().unwrap();
        assert_eq!(conv.unread, 1, "duplicate fold must not double-count");
    }

    #[tokio::test]
    async fn test_blocked_sender_persists_message_but_not_aggregate() {
        // Scenario: the message store has no blocking logic; only the
        // aggregate update is shielded.
        let h = harness();
        let g1 = EntityId::group("g1");
        h.directory
            .set_group(&g1, &EntityId::user("owner"), &[EntityId::user("u1"), me()]);
        h.blocked.add_blocked(&me(), &EntityId::user("u1")).await.unwrap();

        assert!(h
            .aggregator
            .save_instant_message(&group_text("u1", "g1", 5, 100, "spam"))
            .await);

        assert!(h
            .messages
            .get_message(&g1, &EntityId::user("u1"), 5)
            .await
            .unwrap()
            .is_some());
        assert!(
            h.conversations.get_conversation(&g1).await.unwrap().is_none(),
            "blocked sender must not create the conversation"
        );
    }

    #[tokio::test]
    async fn test_failed_message_write_skips_conversation_update() {
        // Ordering gate: no aggregate update for an unsaved message.
        let h = harness();
        let g1 = EntityId::group("g1");
        h.directory
            .set_group(&g1, &EntityId::user("owner"), &[EntityId::user("u1"), me()]);

        h.db.with(|conn| conn.execute_batch("DROP TABLE messages;")).unwrap();

        assert!(
            !h.aggregator
                .save_instant_message(&group_text("u1", "g1", 5, 100, "x"))
                .await
        );
        assert!(h.conversations.get_conversation(&g1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_own_message_counts_no_unread() {
        let h = harness();
        let bob = EntityId::user("bob");

        assert!(h
            .aggregator
            .save_instant_message(&direct_text("me", "bob", 1, 100, "hi bob"))
            .await);

        let conv = h.conversations.get_conversation(&bob).await.unwrap().unwrap();
        assert_eq!(conv.unread, 0);
        // Direct chats carry no sender-name prefix for the local user.
        assert_eq!(conv.preview.as_deref(), Some("hi bob"));
    }

    #[tokio::test]
    async fn test_direct_message_conversation_is_counterpart() {
        let h = harness();
        let alice = EntityId::user("alice");

        assert!(h
            .aggregator
            .save_instant_message(&direct_text("alice", "me", 1, 100, "hi"))
            .await);
        assert!(h
            .conversations
            .get_conversation(&alice)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_muted_message_updates_preview_without_unread() {
        let h = harness();
        let alice = EntityId::user("alice");

        let mut msg = direct_text("alice", "me", 1, 100, "quiet hello");
        msg.muted = true;
        assert!(h.aggregator.save_instant_message(&msg).await);

        let conv = h.conversations.get_conversation(&alice).await.unwrap().unwrap();
        assert_eq!(conv.unread, 0);
        assert_eq!(conv.preview.as_deref(), Some("quiet hello"));
    }

    #[tokio::test]
    async fn test_mention_sets_serial_for_at_all() {
        let h = harness();
        let g1 = EntityId::group("g1");
        h.directory
            .set_group(&g1, &EntityId::user("owner"), &[EntityId::user("u1"), me()]);

        assert!(h
            .aggregator
            .save_instant_message(&group_text("u1", "g1", 7, 100, "wake up @all"))
            .await);
        let conv = h.conversations.get_conversation(&g1).await.unwrap().unwrap();
        assert_eq!(conv.mention_sn, 7);
    }

    #[tokio::test]
    async fn test_mention_by_nickname() {
        let h = harness();
        let g1 = EntityId::group("g1");
        h.directory
            .set_group(&g1, &EntityId::user("owner"), &[EntityId::user("u1"), me()]);

        assert!(h
            .aggregator
            .save_instant_message(&group_text("u1", "g1", 9, 100, "ping @Me please"))
            .await);
        let conv = h.conversations.get_conversation(&g1).await.unwrap().unwrap();
        assert_eq!(conv.mention_sn, 9);
    }

    #[tokio::test]
    async fn test_mention_survives_later_messages_without_mention() {
        let h = harness();
        let g1 = EntityId::group("g1");
        h.directory
            .set_group(&g1, &EntityId::user("owner"), &[EntityId::user("u1"), me()]);

        assert!(h
            .aggregator
            .save_instant_message(&group_text("u1", "g1", 7, 100, "hey @all"))
            .await);
        assert!(h
            .aggregator
            .save_instant_message(&group_text("u1", "g1", 8, 110, "nothing"))
            .await);
        let conv = h.conversations.get_conversation(&g1).await.unwrap().unwrap();
        assert_eq!(conv.mention_sn, 7, "zero mention delta keeps the old serial");
        assert_eq!(conv.unread, 2);
    }

    #[tokio::test]
    async fn test_group_command_updates_preview_without_unread() {
        let h = harness();
        let g1 = EntityId::group("g1");
        h.directory
            .set_group(&g1, &EntityId::user("owner"), &[EntityId::user("u1"), me()]);
        h.directory.set_name(&EntityId::user("u1"), "Uma");
        h.directory.set_name(&EntityId::user("bob"), "Bob");

        let env = Envelope::new(EntityId::user("u1"), g1.clone(), 100);
        let content = Content::new(
            3,
            ContentBody::Command(Command::Group(GroupCommand::Invite {
                members: vec![EntityId::user("bob")],
            })),
        )
        .with_group(g1.clone());
        let msg = InstantMessage::new(env, content);

        assert!(h.aggregator.save_instant_message(&msg).await);
        let conv = h.conversations.get_conversation(&g1).await.unwrap().unwrap();
        assert_eq!(conv.unread, 0, "commands never count as unread");
        assert_eq!(conv.preview.as_deref(), Some("Uma: Uma invited Bob"));
    }

    #[tokio::test]
    async fn test_group_command_hidden_when_not_member() {
        let h = harness();
        let g1 = EntityId::group("g1");
        // Roster without the local user.
        h.directory.set_group(&g1, &EntityId::user("owner"), &[EntityId::user("u1")]);

        let env = Envelope::new(EntityId::user("u1"), g1.clone(), 100);
        let content = Content::new(
            3,
            ContentBody::Command(Command::Group(GroupCommand::Quit)),
        )
        .with_group(g1.clone());

        assert!(h
            .aggregator
            .save_instant_message(&InstantMessage::new(env, content))
            .await);
        assert!(
            h.conversations.get_conversation(&g1).await.unwrap().is_none(),
            "roster churn is hidden from non-members"
        );
    }

    #[tokio::test]
    async fn test_hidden_flag_skips_aggregate() {
        let h = harness();
        let alice = EntityId::user("alice");
        let mut msg = direct_text("alice", "me", 1, 100, "internal");
        msg.content.hidden = true;

        assert!(h.aggregator.save_instant_message(&msg).await);
        assert!(h
            .messages
            .get_message(&alice, &alice, 1)
            .await
            .unwrap()
            .is_some());
        assert!(h.conversations.get_conversation(&alice).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_no_store_commands_accepted_without_rows() {
        let h = harness();
        let env = Envelope::new(EntityId::user("station"), me(), 100);
        let content = Content::new(
            1,
            ContentBody::Command(Command::Search {
                keywords: "bob".to_string(),
            }),
        );

        assert!(h
            .aggregator
            .save_instant_message(&InstantMessage::new(env, content))
            .await);
        assert!(h
            .conversations
            .get_conversation(&EntityId::user("station"))
            .await
            .unwrap()
            .is_none());
        assert!(h
            .messages
            .messages_of(&EntityId::user("station"), 10, 0)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_system_app_custom_content_not_stored() {
        let db = Database::in_memory().unwrap();
        let bus = EventBus::new();
        let mut config = CoreConfig::default();
        config.system_apps = vec!["sys.push".to_string()];
        let directory = Arc::new(FixedDirectory::new(me()));

        let conversations = ConversationStore::new(db.clone(), bus.clone(), &config);
        let messages = MessageStore::new(db.clone(), bus.clone(), &config);
        let blocked = BlockListStore::new(db.clone(), bus.clone(), &config);
        let muted = MuteListStore::new(db.clone(), bus.clone(), &config);
        let shield = Shield::new(directory.clone(), blocked, muted);
        let receipts = ReceiptTracker::new(TraceStore::new(db), directory.clone(), bus.clone());
        let aggregator = Aggregator::new(
            conversations.clone(),
            messages,
            receipts,
            shield,
            directory,
            &config,
        );

        let env = Envelope::new(EntityId::user("alice"), me(), 100);
        let content = Content::new(
            1,
            ContentBody::Custom {
                app: "sys.push".to_string(),
                module: "badge".to_string(),
                action: "set".to_string(),
            },
        );
        assert!(aggregator
            .save_instant_message(&InstantMessage::new(env.clone(), content))
            .await);
        assert!(conversations
            .get_conversation(&EntityId::user("alice"))
            .await
            .unwrap()
            .is_none());

        // Custom content from an unlisted app is a normal chat message.
        let content = Content::new(
            2,
            ContentBody::Custom {
                app: "games.chess".to_string(),
                module: "match".to_string(),
                action: "move".to_string(),
            },
        );
        assert!(aggregator
            .save_instant_message(&InstantMessage::new(env, content))
            .await);
        let conv = conversations
            .get_conversation(&EntityId::user("alice"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conv.preview.as_deref(), Some("[games.chess/match/move]"));
    }

    #[tokio::test]
    async fn test_receipt_routes_to_tracker() {
        let h = harness();
        let alice = EntityId::user("alice");
        let env = Envelope::new(alice.clone(), me(), 200);
        let content = Content::new(
            1,
            ContentBody::Command(Command::Receipt(crate::models::ReceiptCommand {
                text: "Message received".to_string(),
                origin: Some(crate::models::ReceiptOrigin {
                    sender: me(),
                    receiver: Some(alice.clone()),
                    group: None,
                    sn: Some(42),
                    type_tag: Some(crate::models::content_type::TEXT),
                    time: Some(150),
                    signature: Some("aabbccdd".to_string()),
                }),
            })),
        );

        assert!(h
            .aggregator
            .save_instant_message(&InstantMessage::new(env, content))
            .await);
        // The receipt itself never lands in the message store.
        assert!(h
            .messages
            .messages_of(&alice, 10, 0)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_remove_conversation_drops_messages_too() {
        let h = harness();
        let g1 = EntityId::group("g1");
        h.directory
            .set_group(&g1, &EntityId::user("owner"), &[EntityId::user("u1"), me()]);

        for sn in 1..=3 {
            assert!(h
                .aggregator
                .save_instant_message(&group_text("u1", "g1", sn, 100 + sn as i64, "m"))
                .await);
        }
        assert!(h.aggregator.remove_conversation(&g1).await);
        assert!(h.conversations.get_conversation(&g1).await.unwrap().is_none());
        assert!(h.messages.messages_of(&g1, 10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unread_accumulates_then_clears_to_zero() {
        let h = harness();
        let g1 = EntityId::group("g1");
        h.directory
            .set_group(&g1, &EntityId::user("owner"), &[EntityId::user("u1"), me()]);

        for sn in 1..=3 {
            assert!(h
                .aggregator
                .save_instant_message(&group_text("u1", "g1", sn, 100 + sn as i64, "m"))
                .await);
        }
        let conv = h.conversations.get_conversation(&g1).await.unwrap().unwrap();
        assert_eq!(conv.unread, 3);

        assert!(h.conversations.clear_unread(&g1).await.unwrap());
        let conv = h.conversations.get_conversation(&g1).await.unwrap().unwrap();
        assert_eq!(conv.unread, 0);
        assert_eq!(conv.mention_sn, 0);
    }
}
