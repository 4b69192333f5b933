//! Conversation and message models.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{RecordId, Role};

/// The chat channel attached to one project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationRecord {
    pub id: RecordId,

    /// Project the conversation belongs to (one conversation per project)
    pub project_id: RecordId,

    /// Ids of the users taking part
    #[serde(default)]
    pub participants: Vec<RecordId>,

    pub created_at: Timestamp,
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageRecord {
    pub id: RecordId,
    pub conversation_id: RecordId,
    pub sender_id: RecordId,
    pub sender_name: String,
    pub sender_role: Role,
    pub content: String,
    pub created_at: Timestamp,

    /// Whether the recipient has seen the message
    #[serde(default)]
    pub read: bool,
}
