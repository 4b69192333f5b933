//! Filter types for querying the persistence gateway.

use super::{QuoteStatus, RecordId};

/// Filter options for querying projects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectFilter {
    /// Only projects owned by this client
    pub client_id: Option<RecordId>,

    /// Only the project carrying this QR code
    pub qr_code: Option<String>,
}

impl ProjectFilter {
    pub fn for_client(client_id: RecordId) -> Self {
        Self {
            client_id: Some(client_id),
            ..Default::default()
        }
    }
}

/// Filter options for querying conversations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationFilter {
    pub project_id: Option<RecordId>,
}

/// Filter options for querying messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageFilter {
    pub conversation_id: Option<RecordId>,
}

/// Filter options for querying quotes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteFilter {
    pub client_id: Option<RecordId>,

    /// Match any of these statuses; empty means all
    pub statuses: Vec<QuoteStatus>,
}

impl QuoteFilter {
    pub fn matches(&self, client_id: &RecordId, status: QuoteStatus) -> bool {
        let client_matches = match &self.client_id {
            Some(wanted) => wanted == client_id,
            None => true,
        };
        client_matches && (self.statuses.is_empty() || self.statuses.contains(&status))
    }
}
