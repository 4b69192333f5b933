//! Collection wrapper types for displaying groups of records.
//!
//! Lists use a compact per-record format; the full record format is reserved
//! for single-record output.

use std::fmt;

use super::datetime::MaybeDate;
use crate::models::{MessageRecord, ProjectRecord, QuoteRecord, RecordId};

/// Newtype wrapper listing projects as summaries.
///
/// # Examples
///
/// ```rust
/// use elitetrack_core::{
///     display::ProjectSummaries,
///     models::{ProjectRecord, ProjectStatus, RecordId},
/// };
/// use jiff::Timestamp;
///
/// let project = ProjectRecord {
///     id: RecordId::new("prj_1"),
///     client_id: RecordId::new("cli_1"),
///     vehicle_id: RecordId::new("veh_1"),
///     qr_code: "QR-001".to_string(),
///     status: ProjectStatus::Pending,
///     progress: 0,
///     timeline: vec![],
///     start_date: None,
///     estimated_delivery: None,
///     actual_delivery: None,
///     created_at: Timestamp::now(),
///     updated_at: Timestamp::now(),
/// };
///
/// let output = ProjectSummaries(vec![project]).to_string();
/// assert!(output.contains("QR-001"));
/// ```
pub struct ProjectSummaries(pub Vec<ProjectRecord>);

impl ProjectSummaries {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for ProjectSummaries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No projects found.");
        }
        for project in &self.0 {
            writeln!(
                f,
                "## {} (ID: {}) ({}/{})",
                project.qr_code,
                project.id,
                project.completed_steps(),
                project.timeline.len()
            )?;
            writeln!(f)?;
            writeln!(f, "- **Status**: {} ({}%)", project.status, project.progress)?;
            if let Some(step) = project.current_step() {
                writeln!(f, "- **Current step**: {} ({})", step.title, step.status)?;
            }
            writeln!(
                f,
                "- **Estimated delivery**: {}",
                MaybeDate(&project.estimated_delivery)
            )?;
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Newtype wrapper for a conversation's messages, oldest first.
pub struct Messages(pub Vec<MessageRecord>);

impl Messages {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Unread messages not sent by `reader`.
    pub fn unread_for(&self, reader: &RecordId) -> usize {
        self.0
            .iter()
            .filter(|m| !m.read && &m.sender_id != reader)
            .count()
    }
}

impl fmt::Display for Messages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No messages yet.");
        }
        for message in &self.0 {
            write!(f, "{message}")?;
        }
        Ok(())
    }
}

/// Newtype wrapper listing quotes.
pub struct Quotes(pub Vec<QuoteRecord>);

impl Quotes {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for Quotes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No quotes found.");
        }
        for quote in &self.0 {
            write!(f, "{quote}")?;
        }
        Ok(())
    }
}
