//! Conversation and message operations.

use log::debug;

use super::{
    outbox::{PendingWrite, WriteJob},
    state::{Action, Entity},
    ProjectStateController,
};
use crate::{
    error::{Result, TrackerError},
    models::{ConversationRecord, IdKind, MessagePatch, MessageRecord, RecordId, Role},
};

impl ProjectStateController {
    /// Returns the project's conversation, creating it when absent.
    ///
    /// Clients may only open the conversation of their own projects.
    pub async fn open_conversation(
        &self,
        project_id: &RecordId,
    ) -> Result<(ConversationRecord, PendingWrite)> {
        let actor = self.actor();
        let now = self.now();
        let ((conversation, pending), changed) = self.inner.shared.update(|state| {
            let project = state
                .project(project_id)
                .ok_or_else(|| TrackerError::not_found("project", project_id))?;
            if actor.role == Role::Client && project.client_id != actor.id {
                return Err(TrackerError::guard(format!(
                    "project {} belongs to another client",
                    project.id
                )));
            }
            if let Some(existing) = state.conversation_for_project(&project.id) {
                let pending = PendingWrite::settled_now(existing.id.clone());
                return Ok((None, (existing.clone(), pending)));
            }

            let mut participants = vec![project.client_id.clone()];
            if actor.id != project.client_id {
                participants.push(actor.id.clone());
            }
            let conversation = ConversationRecord {
                id: self.inner.ids.next(IdKind::Conversation, now),
                project_id: project.id.clone(),
                participants,
                created_at: now,
            };
            let pending = self.inner.outbox.enqueue(WriteJob::CreateConversation {
                id: conversation.id.clone(),
            });
            Ok((
                Some(Action::Optimistic(Entity::Conversation(conversation.clone()))),
                (conversation, pending),
            ))
        })?;
        self.inner.shared.persist(changed).await;
        Ok((conversation, pending))
    }

    /// Appends a message from the acting user.
    ///
    /// # Errors
    ///
    /// * `TrackerError::Validation` - When `content` is blank
    /// * `TrackerError::NotFound` - When the conversation is unknown
    pub async fn send_message(&self, conversation_id: &RecordId, content: &str) -> Result<PendingWrite> {
        let content = content.trim();
        if content.is_empty() {
            return Err(TrackerError::validation("content").with_reason("must not be empty"));
        }
        let actor = self.actor();
        let now = self.now();

        let (pending, changed) = self.inner.shared.update(|state| {
            let conversation = state
                .conversation(conversation_id)
                .ok_or_else(|| TrackerError::not_found("conversation", conversation_id))?;
            let message = MessageRecord {
                id: self.inner.ids.next(IdKind::Message, now),
                conversation_id: conversation.id.clone(),
                sender_id: actor.id.clone(),
                sender_name: actor.name.clone(),
                sender_role: actor.role,
                content: content.to_string(),
                created_at: now,
                read: false,
            };
            let pending = self.inner.outbox.enqueue(WriteJob::CreateMessage {
                id: message.id.clone(),
            });
            Ok((Some(Action::Optimistic(Entity::Message(message))), pending))
        })?;
        debug!("queued message {} in {conversation_id}", pending.id());
        self.inner.shared.persist(changed).await;
        Ok(pending)
    }

    /// Marks every message the acting user received in the conversation as
    /// read.
    ///
    /// Only messages that already have a canonical id are written back; the
    /// rest are updated locally.
    pub async fn mark_conversation_read(&self, conversation_id: &RecordId) -> Result<PendingWrite> {
        let actor = self.actor();
        let (pending, changed) = self.inner.shared.update(|state| {
            let conversation = state
                .conversation(conversation_id)
                .ok_or_else(|| TrackerError::not_found("conversation", conversation_id))?;
            let unread: Vec<RecordId> = state
                .messages_in(&conversation.id)
                .filter(|m| !m.read && m.sender_id != actor.id)
                .map(|m| m.id.clone())
                .collect();
            if unread.is_empty() {
                return Ok((None, PendingWrite::settled_now(conversation.id.clone())));
            }

            let patches: Vec<_> = unread
                .iter()
                .filter(|id| !id.is_provisional())
                .map(|id| (id.clone(), MessagePatch { read: Some(true) }))
                .collect();
            let pending = if patches.is_empty() {
                PendingWrite::settled_now(conversation.id.clone())
            } else {
                self.inner.outbox.enqueue(WriteJob::UpdateMessages {
                    conversation_id: conversation.id.clone(),
                    patches,
                })
            };
            Ok((Some(Action::MarkRead(unread)), pending))
        })?;
        self.inner.shared.persist(changed).await;
        Ok(pending)
    }

    pub fn conversation(&self, id: &RecordId) -> Result<ConversationRecord> {
        self.inner
            .shared
            .read(|s| s.conversation(id).cloned())
            .ok_or_else(|| TrackerError::not_found("conversation", id))
    }

    pub fn conversation_for_project(&self, project_id: &RecordId) -> Option<ConversationRecord> {
        self.inner
            .shared
            .read(|s| s.conversation_for_project(project_id).cloned())
    }

    /// Messages of a conversation in creation order.
    pub fn messages(&self, conversation_id: &RecordId) -> Vec<MessageRecord> {
        self.inner
            .shared
            .read(|s| s.messages_in(conversation_id).cloned().collect())
    }

    /// Messages in the conversation that the acting user has not read.
    pub fn unread_count(&self, conversation_id: &RecordId) -> usize {
        let actor = &self.actor().id;
        self.inner.shared.read(|s| {
            s.messages_in(conversation_id)
                .filter(|m| !m.read && &m.sender_id != actor)
                .count()
        })
    }

    /// Unread messages across every conversation of the session.
    pub fn total_unread(&self) -> usize {
        let actor = &self.actor().id;
        self.inner.shared.read(|s| {
            s.messages
                .iter()
                .filter(|m| !m.read && &m.sender_id != actor)
                .count()
        })
    }
}
