use crate::collab::Directory;
use crate::models::{Command, Content, ContentBody, EntityId, GroupCommand};

/// Preview text is capped at this many characters (ellipsis appended).
const MAX_PREVIEW_CHARS: usize = 200;

/// Collapse newlines, trim, and cap the length for the conversation list.
pub(crate) fn collapse(text: &str) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    let trimmed = flat.trim();
    let mut out: String = trimmed.chars().take(MAX_PREVIEW_CHARS).collect();
    if trimmed.chars().count() > MAX_PREVIEW_CHARS {
        out.push('…');
    }
    out
}

/// Whether `text` mentions `token` as `@token` at the end or followed by a
/// space. The tokens are matched literally, including case.
fn mentions(text: &str, token: &str) -> bool {
    let needle = format!("@{token}");
    text.ends_with(&needle) || text.contains(&format!("{needle} "))
}

/// Mention serial for a text message: the content's sn when the local user's
/// nickname or `@all`/`@All` is mentioned, zero otherwise.
pub(crate) fn scan_mention(text: &str, nickname: &str, sn: u64) -> u64 {
    if mentions(text, "all") || mentions(text, "All") {
        return sn;
    }
    if !nickname.is_empty() && mentions(text, nickname) {
        return sn;
    }
    0
}

async fn names_of(directory: &dyn Directory, members: &[EntityId]) -> String {
    let mut names = Vec::with_capacity(members.len());
    for member in members {
        names.push(directory.name_of(member).await);
    }
    names.join(", ")
}

async fn command_text(
    command: &Command,
    sender: &EntityId,
    directory: &dyn Directory,
) -> String {
    let actor = directory.name_of(sender).await;
    match command {
        Command::Group(GroupCommand::Reset { members }) => {
            format!("{actor} reset the member list ({} members)", members.len())
        }
        Command::Group(GroupCommand::Invite { members }) => {
            format!("{actor} invited {}", names_of(directory, members).await)
        }
        Command::Group(GroupCommand::Expel { members }) => {
            format!("{actor} expelled {}", names_of(directory, members).await)
        }
        Command::Group(GroupCommand::Join) => format!("{actor} joined the group"),
        Command::Group(GroupCommand::Quit) => format!("{actor} left the group"),
        Command::Group(GroupCommand::Query) => format!("{actor} queried the member list"),
        Command::Handshake { .. } => "[Handshake]".to_string(),
        Command::Login(_) => "[Login]".to_string(),
        Command::Report { title } => format!("[Report: {title}]"),
        Command::Meta { .. } => "[Meta]".to_string(),
        Command::Document { .. } => "[Document]".to_string(),
        Command::Search { keywords } => format!("[Search: {keywords}]"),
        Command::Receipt(receipt) => receipt.text.clone(),
    }
}

/// Human-readable one-liner for a content, before collapsing/truncation.
pub(crate) async fn preview_text(
    content: &Content,
    sender: &EntityId,
    directory: &dyn Directory,
) -> String {
    let raw = match &content.body {
        ContentBody::Text { text } => text.clone(),
        ContentBody::File(f) => {
            let name = f.filename.as_deref().unwrap_or("");
            format!("[{}:{}]", f.kind.label(), name)
        }
        ContentBody::Page { url, title } => {
            if title.is_empty() {
                format!("[Page:{url}]")
            } else {
                title.clone()
            }
        }
        ContentBody::Custom {
            app,
            module,
            action,
        } => format!("[{app}/{module}/{action}]"),
        ContentBody::Command(command) => command_text(command, sender, directory).await,
        ContentBody::Forward { messages } => format!("[Forwarded {} message(s)]", messages.len()),
        ContentBody::Array { contents } => format!("[{} contents]", contents.len()),
        ContentBody::Unsupported { type_tag, .. } => format!("[Unsupported:0x{type_tag:02X}]"),
    };
    collapse(&raw)
}
