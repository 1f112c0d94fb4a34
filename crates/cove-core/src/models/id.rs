use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What kind of entity an identifier names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Group,
    Broadcast,
}

impl EntityKind {
    fn tag(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Group => "group",
            EntityKind::Broadcast => "broadcast",
        }
    }
}

/// Opaque entity identifier: a user, a group, or a broadcast address.
///
/// The address payload is whatever the identity layer hands us (typically a
/// base58 fingerprint); this core only compares, hashes and stores it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    kind: EntityKind,
    address: String,
}

impl EntityId {
    pub fn user(address: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::User,
            address: address.into(),
        }
    }

    pub fn group(address: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Group,
            address: address.into(),
        }
    }

    /// The "everyone@everywhere" broadcast address.
    pub fn everyone() -> Self {
        Self {
            kind: EntityKind::Broadcast,
            address: "everyone".to_string(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_user(&self) -> bool {
        self.kind == EntityKind::User
    }

    pub fn is_group(&self) -> bool {
        self.kind == EntityKind::Group
    }

    pub fn is_broadcast(&self) -> bool {
        self.kind == EntityKind::Broadcast
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.tag(), self.address)
    }
}

impl FromStr for EntityId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, address) = s
            .split_once(':')
            .ok_or_else(|| format!("malformed entity id: {s}"))?;
        let kind = match tag {
            "user" => EntityKind::User,
            "group" => EntityKind::Group,
            "broadcast" => EntityKind::Broadcast,
            other => return Err(format!("unknown entity kind: {other}")),
        };
        if address.is_empty() {
            return Err(format!("empty address in entity id: {s}"));
        }
        Ok(Self {
            kind,
            address: address.to_string(),
        })
    }
}
