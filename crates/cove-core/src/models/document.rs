use serde::{Deserialize, Serialize};

use super::id::EntityId;

/// Signed profile document (visa, bulletin, ...) for an entity.
/// Verification happens in the identity layer; this core only stores and
/// time-orders them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: EntityId,
    pub doc_type: String,
    pub properties: serde_json::Value,
    pub signature: String,
    pub time: i64,
}

/// Identity meta: the key material an entity id is generated from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub id: EntityId,
    pub public_key: String,
    pub time: i64,
}

/// Last login command seen for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRecord {
    pub user: EntityId,
    pub station: Option<String>,
    pub time: i64,
}
