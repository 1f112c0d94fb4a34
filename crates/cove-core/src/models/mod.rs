pub mod content;
pub mod conversation;
pub mod document;
pub mod envelope;
pub mod id;
pub mod message;

pub use content::{
    content_type, Command, Content, ContentBody, FileContent, FileKind, GroupCommand,
    LoginCommand, ReceiptCommand, ReceiptOrigin,
};
pub use conversation::Conversation;
pub use document::{Document, LoginRecord, Meta};
pub use envelope::{signature_fragment, Envelope, InstantMessage, ReliableMessage};
pub use id::{EntityId, EntityKind};
pub use message::MessageRecord;
