//! Result wrapper types for displaying operation outcomes.

use std::fmt;

use crate::models::{ConversationRecord, MessageRecord, ProjectRecord, QuoteRecord};

/// Where a write ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    /// Accepted by the store
    Stored,
    /// Kept in the local cache only
    LocalOnly,
}

impl fmt::Display for Persistence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Persistence::Stored => f.write_str("stored"),
            Persistence::LocalOnly => f.write_str("saved locally, not yet stored"),
        }
    }
}

/// Wrapper type for displaying the result of create operations.
///
/// # Examples
///
/// ```rust
/// use elitetrack_core::{
///     display::{CreateResult, Persistence},
///     models::{ConversationRecord, RecordId},
/// };
/// use jiff::Timestamp;
///
/// let conversation = ConversationRecord {
///     id: RecordId::new("cnv_3"),
///     project_id: RecordId::new("prj_1"),
///     participants: vec![RecordId::new("cli_1")],
///     created_at: Timestamp::now(),
/// };
///
/// let output = CreateResult::new(conversation, Persistence::Stored).to_string();
/// assert!(output.starts_with("Created conversation with ID: cnv_3 (stored)"));
/// ```
pub struct CreateResult<T> {
    pub resource: T,
    pub persistence: Persistence,
}

impl<T> CreateResult<T> {
    pub fn new(resource: T, persistence: Persistence) -> Self {
        Self {
            resource,
            persistence,
        }
    }
}

macro_rules! create_result_display {
    ($ty:ty, $label:literal) => {
        impl fmt::Display for CreateResult<$ty> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                writeln!(
                    f,
                    concat!("Created ", $label, " with ID: {} ({})"),
                    self.resource.id, self.persistence
                )?;
                writeln!(f)?;
                write!(f, "{}", self.resource)
            }
        }
    };
}

create_result_display!(ProjectRecord, "project");
create_result_display!(ConversationRecord, "conversation");
create_result_display!(MessageRecord, "message");
create_result_display!(QuoteRecord, "quote");

/// Wrapper type for displaying the result of update operations, with the
/// list of changes made.
pub struct UpdateResult<T> {
    pub resource: T,
    pub changes: Vec<String>,
    pub persistence: Persistence,
}

impl<T> UpdateResult<T> {
    pub fn new(resource: T, persistence: Persistence) -> Self {
        Self {
            resource,
            changes: Vec::new(),
            persistence,
        }
    }

    pub fn with_changes(resource: T, changes: Vec<String>, persistence: Persistence) -> Self {
        Self {
            resource,
            changes,
            persistence,
        }
    }
}

macro_rules! update_result_display {
    ($ty:ty, $label:literal) => {
        impl fmt::Display for UpdateResult<$ty> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                writeln!(
                    f,
                    concat!("Updated ", $label, " with ID: {} ({})"),
                    self.resource.id, self.persistence
                )?;

                if !self.changes.is_empty() {
                    writeln!(f)?;
                    writeln!(f, "Changes made:")?;
                    for change in &self.changes {
                        writeln!(f, "- {change}")?;
                    }
                }

                writeln!(f)?;
                write!(f, "{}", self.resource)
            }
        }
    };
}

update_result_display!(ProjectRecord, "project");
update_result_display!(QuoteRecord, "quote");

#[cfg(test)]
mod tests {
    use jiff::Timestamp;

    use super::*;
    use crate::models::{QuoteStatus, QuoteVehicle, RecordId};

    #[test]
    fn test_update_result_lists_changes() {
        let quote = QuoteRecord {
            id: RecordId::new("quo_4"),
            client_id: RecordId::new("cli_1"),
            project_id: None,
            vehicle: QuoteVehicle {
                brand: "Toyota".to_string(),
                model: "Hilux".to_string(),
                year: Some(2024),
                plate: None,
            },
            protection_level: Some("III-A".to_string()),
            service_type: "Full armoring".to_string(),
            description: None,
            status: QuoteStatus::Sent,
            created_at: Timestamp::from_second(1_700_000_000).unwrap(),
            estimated_price: Some(95_000.0),
            estimated_days: Some(30),
            executor_notes: None,
            executor_id: Some(RecordId::new("exe_1")),
            executor_name: Some("Carlos".to_string()),
            responded_at: Some(Timestamp::from_second(1_700_100_000).unwrap()),
            client_response: None,
            approved_at: None,
            rejected_at: None,
        };

        let output = UpdateResult::with_changes(
            quote,
            vec!["Status: analyzed → sent".to_string()],
            Persistence::LocalOnly,
        )
        .to_string();

        assert!(output.starts_with("Updated quote with ID: quo_4 (saved locally"));
        assert!(output.contains("- Status: analyzed → sent"));
        assert!(output.contains("Proposal: 95000.00 in 30 days"));
        assert!(output.contains("Toyota Hilux (2024)"));
    }
}
