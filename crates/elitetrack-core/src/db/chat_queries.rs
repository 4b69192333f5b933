//! Conversation and message queries.

use jiff::Timestamp;
use rusqlite::{params, OptionalExtension};

use super::utils::{canonical_id, parsed, row_id, timestamp};
use crate::{
    error::{DatabaseResultExt, Result, TrackerError},
    models::{
        ConversationFilter, ConversationRecord, IdKind, MessageFilter, MessagePatch,
        MessageRecord, RecordId,
    },
};

const SELECT_CONVERSATION_BY_PROJECT_SQL: &str =
    "SELECT id, project_id, participants, created_at FROM conversations WHERE project_id = ?1";
const INSERT_CONVERSATION_SQL: &str =
    "INSERT INTO conversations (project_id, participants, created_at) VALUES (?1, ?2, ?3)";
const SELECT_CONVERSATIONS_SQL: &str = "SELECT id, project_id, participants, created_at FROM conversations WHERE (?1 IS NULL OR project_id = ?1) ORDER BY created_at, id";
const CHECK_CONVERSATION_EXISTS_SQL: &str =
    "SELECT EXISTS(SELECT 1 FROM conversations WHERE id = ?1)";
const INSERT_MESSAGE_SQL: &str = "INSERT INTO messages (conversation_id, sender_id, sender_name, sender_role, content, created_at, read) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";
const SELECT_MESSAGE_SQL: &str = "SELECT id, conversation_id, sender_id, sender_name, sender_role, content, created_at, read FROM messages WHERE id = ?1";
const SELECT_MESSAGES_SQL: &str = "SELECT id, conversation_id, sender_id, sender_name, sender_role, content, created_at, read FROM messages WHERE (?1 IS NULL OR conversation_id = ?1) ORDER BY created_at, id";
const UPDATE_MESSAGE_READ_SQL: &str = "UPDATE messages SET read = ?1 WHERE id = ?2";

impl super::Database {
    fn build_conversation_from_row(row: &rusqlite::Row) -> rusqlite::Result<ConversationRecord> {
        let participants: Vec<String> = super::utils::string_list(row, 2)?;
        Ok(ConversationRecord {
            id: canonical_id(row, 0, IdKind::Conversation)?,
            project_id: RecordId::new(row.get::<_, String>(1)?),
            participants: participants.into_iter().map(RecordId::new).collect(),
            created_at: timestamp(row, 3)?,
        })
    }

    fn build_message_from_row(row: &rusqlite::Row) -> rusqlite::Result<MessageRecord> {
        Ok(MessageRecord {
            id: canonical_id(row, 0, IdKind::Message)?,
            conversation_id: canonical_id(row, 1, IdKind::Conversation)?,
            sender_id: RecordId::new(row.get::<_, String>(2)?),
            sender_name: row.get(3)?,
            sender_role: parsed(row, 4)?,
            content: row.get(5)?,
            created_at: timestamp(row, 6)?,
            read: row.get(7)?,
        })
    }

    /// Stores a conversation. A project has at most one conversation; if one
    /// already exists it is returned unchanged.
    pub fn insert_conversation(&mut self, draft: &ConversationRecord) -> Result<ConversationRecord> {
        let existing = self
            .connection
            .query_row(
                SELECT_CONVERSATION_BY_PROJECT_SQL,
                params![draft.project_id.as_str()],
                Self::build_conversation_from_row,
            )
            .optional()
            .db_context("Failed to look up conversation")?;
        if let Some(conversation) = existing {
            return Ok(conversation);
        }

        let participants: Vec<&str> = draft.participants.iter().map(RecordId::as_str).collect();
        let created_at = Timestamp::now();
        self.connection
            .execute(
                INSERT_CONVERSATION_SQL,
                params![
                    draft.project_id.as_str(),
                    serde_json::to_string(&participants)?,
                    created_at.to_string()
                ],
            )
            .db_context("Failed to insert conversation")?;

        Ok(ConversationRecord {
            id: RecordId::canonical(IdKind::Conversation, self.connection.last_insert_rowid()),
            project_id: draft.project_id.clone(),
            participants: draft.participants.clone(),
            created_at,
        })
    }

    pub fn list_conversations(&self, filter: &ConversationFilter) -> Result<Vec<ConversationRecord>> {
        let mut stmt = self
            .connection
            .prepare(SELECT_CONVERSATIONS_SQL)
            .db_context("Failed to prepare query")?;

        let conversations = stmt
            .query_map(
                params![filter.project_id.as_ref().map(RecordId::as_str)],
                Self::build_conversation_from_row,
            )
            .db_context("Failed to query conversations")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .db_context("Failed to fetch conversations")?;

        Ok(conversations)
    }

    /// Stores a message; the store assigns the id and creation time.
    pub fn insert_message(&mut self, draft: &MessageRecord) -> Result<MessageRecord> {
        let conversation_row = row_id(IdKind::Conversation, &draft.conversation_id)?;
        let exists: bool = self
            .connection
            .query_row(CHECK_CONVERSATION_EXISTS_SQL, params![conversation_row], |row| {
                row.get(0)
            })
            .db_context("Failed to check conversation existence")?;
        if !exists {
            return Err(TrackerError::not_found("conversation", &draft.conversation_id));
        }

        let created_at = Timestamp::now();
        self.connection
            .execute(
                INSERT_MESSAGE_SQL,
                params![
                    conversation_row,
                    draft.sender_id.as_str(),
                    draft.sender_name,
                    draft.sender_role.as_str(),
                    draft.content,
                    created_at.to_string(),
                    draft.read
                ],
            )
            .db_context("Failed to insert message")?;

        Ok(MessageRecord {
            id: RecordId::canonical(IdKind::Message, self.connection.last_insert_rowid()),
            created_at,
            ..draft.clone()
        })
    }

    pub fn list_messages(&self, filter: &MessageFilter) -> Result<Vec<MessageRecord>> {
        let conversation_row = filter
            .conversation_id
            .as_ref()
            .map(|id| row_id(IdKind::Conversation, id))
            .transpose()?;

        let mut stmt = self
            .connection
            .prepare(SELECT_MESSAGES_SQL)
            .db_context("Failed to prepare query")?;

        let messages = stmt
            .query_map(params![conversation_row], Self::build_message_from_row)
            .db_context("Failed to query messages")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .db_context("Failed to fetch messages")?;

        Ok(messages)
    }

    /// Applies a patch to a message and returns the stored record.
    pub fn update_message(&mut self, id: &RecordId, patch: &MessagePatch) -> Result<MessageRecord> {
        let row = row_id(IdKind::Message, id)?;
        if let Some(read) = patch.read {
            self.connection
                .execute(UPDATE_MESSAGE_READ_SQL, params![read, row])
                .db_context("Failed to update message")?;
        }

        self.connection
            .query_row(SELECT_MESSAGE_SQL, params![row], Self::build_message_from_row)
            .optional()
            .db_context("Failed to get message")?
            .ok_or_else(|| TrackerError::not_found("message", id))
    }
}
