//! Contracts of the remote store and the directory collaborator.
//!
//! The gateway is authoritative and last-write-wins. Creates return the
//! canonical record (server id, timestamps, computed fields); updates take a
//! patch of changed fields and return nothing. Every record coming back is
//! checked with [`dto`] before it reaches a collection.

use async_trait::async_trait;

use crate::{
    error::Result,
    models::{
        ClientProfile, ConversationFilter, ConversationRecord, MessageFilter, MessagePatch,
        MessageRecord, ProjectFilter, ProjectPatch, ProjectRecord, QuoteFilter, QuotePatch,
        QuoteRecord, RecordId, StepPatch, Vehicle,
    },
};

pub mod dto;

/// Remote CRUD per entity.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Stores a project together with its timeline.
    async fn create_project(&self, draft: &ProjectRecord) -> Result<ProjectRecord>;
    async fn update_project(&self, id: &RecordId, patch: &ProjectPatch) -> Result<()>;
    async fn update_step(&self, id: &RecordId, patch: &StepPatch) -> Result<()>;
    async fn query_projects(&self, filter: &ProjectFilter) -> Result<Vec<ProjectRecord>>;

    async fn create_conversation(&self, draft: &ConversationRecord) -> Result<ConversationRecord>;
    async fn query_conversations(
        &self,
        filter: &ConversationFilter,
    ) -> Result<Vec<ConversationRecord>>;

    async fn create_message(&self, draft: &MessageRecord) -> Result<MessageRecord>;
    async fn update_message(&self, id: &RecordId, patch: &MessagePatch) -> Result<()>;
    async fn query_messages(&self, filter: &MessageFilter) -> Result<Vec<MessageRecord>>;

    async fn create_quote(&self, draft: &QuoteRecord) -> Result<QuoteRecord>;
    async fn update_quote(&self, id: &RecordId, patch: &QuotePatch) -> Result<()>;
    async fn query_quotes(&self, filter: &QuoteFilter) -> Result<Vec<QuoteRecord>>;
}

/// Resolves client and vehicle references.
#[async_trait]
pub trait DirectoryLookup: Send + Sync {
    async fn client(&self, id: &RecordId) -> Result<Option<ClientProfile>>;
    async fn client_by_email(&self, email: &str) -> Result<Option<ClientProfile>>;
    async fn vehicle(&self, id: &RecordId) -> Result<Option<Vehicle>>;
}
