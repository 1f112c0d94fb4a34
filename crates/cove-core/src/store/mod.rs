pub mod cache;
pub mod contacts;
pub mod conversations;
pub mod db;
pub mod documents;
pub mod groups;
pub mod keys;
mod list;
pub mod messages;
pub mod traces;

pub use cache::CachePool;
pub use contacts::{BlockListStore, ContactStore, MuteListStore};
pub use conversations::ConversationStore;
pub use db::Database;
pub use documents::{DocumentStore, MetaStore};
pub use groups::{AdminStore, MemberStore};
pub use keys::{LoginStore, PrivateKeyStore};
pub use messages::MessageStore;
pub use traces::{TraceRecord, TraceStore};
