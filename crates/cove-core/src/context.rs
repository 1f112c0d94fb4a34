use std::sync::Arc;

use crate::bus::EventBus;
use crate::collab::{Directory, Messenger};
use crate::config::CoreConfig;
use crate::error::StoreResult;
use crate::ingest::{Aggregator, ReceiptTracker, Shield, Vestibule};
use crate::store::{
    AdminStore, BlockListStore, ContactStore, ConversationStore, Database, DocumentStore,
    LoginStore, MemberStore, MessageStore, MetaStore, MuteListStore, PrivateKeyStore, TraceStore,
};

/// Owns every service of the sync core and wires them together. One
/// instance per logged-in account; nothing in here is a process-wide
/// singleton.
pub struct CoreContext {
    pub config: CoreConfig,
    pub db: Database,
    pub bus: EventBus,

    pub conversations: Arc<ConversationStore>,
    pub messages: Arc<MessageStore>,
    pub contacts: Arc<ContactStore>,
    pub blocked: Arc<BlockListStore>,
    pub muted: Arc<MuteListStore>,
    pub members: Arc<MemberStore>,
    pub admins: Arc<AdminStore>,
    pub documents: Arc<DocumentStore>,
    pub metas: Arc<MetaStore>,
    pub private_keys: Arc<PrivateKeyStore>,
    pub logins: Arc<LoginStore>,
    pub traces: Arc<TraceStore>,

    pub aggregator: Arc<Aggregator>,
    pub vestibule: Arc<Vestibule>,
}

impl CoreContext {
    /// Open (or create) the on-disk database under `config.data_dir` and
    /// build the full service graph.
    pub fn open(
        config: CoreConfig,
        directory: Arc<dyn Directory>,
        messenger: Arc<dyn Messenger>,
    ) -> StoreResult<Self> {
        let db = Database::open(&config.data_dir)?;
        Ok(Self::assemble(config, db, directory, messenger))
    }

    /// Fully in-memory context, for tests and ephemeral sessions.
    pub fn in_memory(
        directory: Arc<dyn Directory>,
        messenger: Arc<dyn Messenger>,
    ) -> StoreResult<Self> {
        let db = Database::in_memory()?;
        Ok(Self::assemble(
            CoreConfig::default(),
            db,
            directory,
            messenger,
        ))
    }

    fn assemble(
        config: CoreConfig,
        db: Database,
        directory: Arc<dyn Directory>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        let bus = EventBus::new();

        let conversations = ConversationStore::new(db.clone(), bus.clone(), &config);
        let messages = MessageStore::new(db.clone(), bus.clone(), &config);
        let contacts = ContactStore::new(db.clone(), bus.clone(), &config);
        let blocked = BlockListStore::new(db.clone(), bus.clone(), &config);
        let muted = MuteListStore::new(db.clone(), bus.clone(), &config);
        let members = MemberStore::new(db.clone(), bus.clone(), &config);
        let admins = AdminStore::new(db.clone(), bus.clone(), &config);
        let documents = DocumentStore::new(db.clone(), bus.clone(), &config);
        let metas = MetaStore::new(db.clone(), bus.clone(), &config);
        let private_keys = PrivateKeyStore::new(db.clone(), &config);
        let logins = LoginStore::new(db.clone(), bus.clone(), &config);
        let traces = TraceStore::new(db.clone());

        let shield = Shield::new(directory.clone(), blocked.clone(), muted.clone());
        let receipts = ReceiptTracker::new(traces.clone(), directory.clone(), bus.clone());
        let aggregator = Arc::new(Aggregator::new(
            conversations.clone(),
            messages.clone(),
            receipts,
            shield,
            directory.clone(),
            &config,
        ));
        let vestibule = Vestibule::new(directory, messenger);

        Self {
            config,
            db,
            bus,
            conversations,
            messages,
            contacts,
            blocked,
            muted,
            members,
            admins,
            documents,
            metas,
            private_keys,
            logins,
            traces,
            aggregator,
            vestibule,
        }
    }

    /// Start the vestibule's bus listener. Call once after construction;
    /// drop or abort the handle to stop it.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        self.vestibule.spawn(&self.bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::testing::{FixedDirectory, RecordingMessenger};
    use crate::models::{Content, EntityId, Envelope, InstantMessage};

    #[tokio::test]
    async fn test_context_end_to_end_ingest_and_replay() {
        let me = EntityId::user("me");
        let directory = Arc::new(FixedDirectory::new(me.clone()));
        let messenger = Arc::new(RecordingMessenger::default());
        let ctx = CoreContext::in_memory(directory.clone(), messenger.clone()).unwrap();
        let listener = ctx.start();

        // Normal ingest path.
        let alice = EntityId::user("alice");
        let env = Envelope::new(alice.clone(), me.clone(), 100);
        let msg = InstantMessage::new(env, Content::text(1, "hello"));
        assert!(ctx.aggregator.save_instant_message(&msg).await);
        let conv = ctx.conversations.get_conversation(&alice).await.unwrap().unwrap();
        assert_eq!(conv.unread, 1);

        // Deferred path: an outbound message waiting on bob's key resumes
        // once his document lands.
        let bob = EntityId::user("bob");
        let pending = InstantMessage::new(
            Envelope::new(me.clone(), bob.clone(), 110),
            Content::text(2, "are you there"),
        );
        ctx.vestibule.suspend_instant_message(pending).await;
        directory.add_key(&bob);
        ctx.documents
            .save_document(&crate::models::Document {
                id: bob.clone(),
                doc_type: "visa".to_string(),
                properties: serde_json::json!({"key": "pk"}),
                signature: "sig".to_string(),
                time: 100,
            })
            .await
            .unwrap();

        for _ in 0..100 {
            if messenger.sent_instant.lock().len() == 1 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(messenger.sent_instant.lock().len(), 1);
        listener.abort();
    }
}
