use serde::{Deserialize, Serialize};

use super::id::EntityId;

/// Numeric content-type tags as they appear on the wire and in message rows.
/// Receipts reference originals by tag, so the constants live here rather
/// than being derived from the enum.
pub mod content_type {
    pub const TEXT: u32 = 0x01;
    pub const FILE: u32 = 0x10;
    pub const IMAGE: u32 = 0x12;
    pub const AUDIO: u32 = 0x14;
    pub const VIDEO: u32 = 0x16;
    pub const PAGE: u32 = 0x20;
    pub const COMMAND: u32 = 0x88;
    pub const HISTORY: u32 = 0x89;
    pub const APPLICATION: u32 = 0xA0;
    pub const ARRAY: u32 = 0xCA;
    pub const CUSTOMIZED: u32 = 0xCC;
    pub const FORWARD: u32 = 0xFF;
}

/// File payload kinds. Embedded bytes are carried in memory only and get
/// stripped before the record is serialized to a row (see
/// [`FileContent::without_data`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Audio,
    Video,
    Other,
}

impl FileKind {
    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Image => "Image",
            FileKind::Audio => "Audio",
            FileKind::Video => "Video",
            FileKind::Other => "File",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileContent {
    pub kind: FileKind,
    pub filename: Option<String>,
    pub url: Option<String>,
    pub size: Option<u64>,
    /// Raw bytes, present only while the attachment is in flight.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
}

impl FileContent {
    /// Copy with the embedded bytes dropped; metadata only.
    pub fn without_data(&self) -> Self {
        Self {
            data: None,
            ..self.clone()
        }
    }
}

/// Reference to the original envelope a receipt acknowledges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptOrigin {
    pub sender: EntityId,
    pub receiver: Option<EntityId>,
    pub group: Option<EntityId>,
    pub sn: Option<u64>,
    pub type_tag: Option<u32>,
    pub time: Option<i64>,
    /// Trailing fragment of the original signature, for fast matching.
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptCommand {
    pub text: String,
    pub origin: Option<ReceiptOrigin>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginCommand {
    pub user: EntityId,
    pub station: Option<String>,
    pub time: i64,
}

/// Group history commands. `members` is the operand list, not the resulting
/// roster (except for `Reset`, where it is the full new roster).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "cmd")]
pub enum GroupCommand {
    Reset { members: Vec<EntityId> },
    Invite { members: Vec<EntityId> },
    Expel { members: Vec<EntityId> },
    Join,
    Quit,
    Query,
}

impl GroupCommand {
    pub fn is_lifecycle(&self) -> bool {
        // Query is a pull request, not a roster change.
        !matches!(self, GroupCommand::Query)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "command")]
pub enum Command {
    Handshake { session: Option<String> },
    Login(LoginCommand),
    Report { title: String },
    Meta { id: EntityId },
    Document { id: EntityId },
    Search { keywords: String },
    Receipt(ReceiptCommand),
    Group(GroupCommand),
}

/// Closed set of content kinds this core understands. Anything newer on the
/// wire lands in `Unsupported` with its raw payload preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ContentBody {
    Text {
        text: String,
    },
    File(FileContent),
    Page {
        url: String,
        title: String,
    },
    Custom {
        app: String,
        module: String,
        action: String,
    },
    Command(Command),
    /// Forwarded envelope(s); the payloads stay opaque here.
    Forward {
        messages: Vec<serde_json::Value>,
    },
    Array {
        contents: Vec<serde_json::Value>,
    },
    Unsupported {
        type_tag: u32,
        payload: serde_json::Value,
    },
}

/// A decoded message body plus the per-content bookkeeping every kind
/// carries: sequence number, optional time/group, and display flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub sn: u64,
    pub time: Option<i64>,
    pub group: Option<EntityId>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub muted: bool,
    pub body: ContentBody,
}

impl Content {
    pub fn new(sn: u64, body: ContentBody) -> Self {
        Self {
            sn,
            time: None,
            group: None,
            hidden: false,
            muted: false,
            body,
        }
    }

    pub fn text(sn: u64, text: impl Into<String>) -> Self {
        Self::new(
            sn,
            ContentBody::Text {
                text: text.into(),
            },
        )
    }

    pub fn with_group(mut self, group: EntityId) -> Self {
        self.group = Some(group);
        self
    }

    pub fn with_time(mut self, time: i64) -> Self {
        self.time = Some(time);
        self
    }

    pub fn is_command(&self) -> bool {
        matches!(self.body, ContentBody::Command(_))
    }

    pub fn type_tag(&self) -> u32 {
        match &self.body {
            ContentBody::Text { .. } => content_type::TEXT,
            ContentBody::File(f) => match f.kind {
                FileKind::Image => content_type::IMAGE,
                FileKind::Audio => content_type::AUDIO,
                FileKind::Video => content_type::VIDEO,
                FileKind::Other => content_type::FILE,
            },
            ContentBody::Page { .. } => content_type::PAGE,
            ContentBody::Custom { .. } => content_type::CUSTOMIZED,
            ContentBody::Command(_) => content_type::COMMAND,
            ContentBody::Forward { .. } => content_type::FORWARD,
            ContentBody::Array { .. } => content_type::ARRAY,
            ContentBody::Unsupported { type_tag, .. } => *type_tag,
        }
    }

    /// Copy fit for persistence: attachment bytes removed, everything else
    /// intact.
    pub fn for_storage(&self) -> Self {
        match &self.body {
            ContentBody::File(f) if f.data.is_some() => Self {
                body: ContentBody::File(f.without_data()),
                ..self.clone()
            },
            _ => self.clone(),
        }
    }
}
