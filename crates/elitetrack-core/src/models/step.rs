//! Timeline step model definition.

use jiff::{civil::Date, Timestamp};
use serde::{Deserialize, Serialize};

use super::{RecordId, StepStatus};

/// One stage of a project's armoring workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineStep {
    /// Unique identifier for the step
    pub id: RecordId,

    /// ID of the owning project
    pub project_id: RecordId,

    /// Position within the project's timeline (0-indexed, fixed at creation)
    pub position: u32,

    /// Short title of the stage
    pub title: String,

    /// Longer description of the work done in this stage
    pub description: Option<String>,

    /// Current status of the step
    pub status: StepStatus,

    /// Forecast date for this stage, set when the previous stage completes
    pub estimated_date: Option<Date>,

    /// When the stage was completed (UTC)
    pub completion_date: Option<Timestamp>,

    /// Technician responsible for the stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technician: Option<String>,

    /// Free-form notes from the technician
    pub notes: Option<String>,

    /// Public URLs of evidence photos, in upload order without duplicates
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<String>,

    /// Timestamp when the step was last updated (UTC)
    pub updated_at: Timestamp,
}

impl TimelineStep {
    /// Creates a fresh pending step.
    pub fn new(
        id: RecordId,
        project_id: RecordId,
        position: u32,
        title: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            project_id,
            position,
            title: title.into(),
            description: None,
            status: StepStatus::Pending,
            estimated_date: None,
            completion_date: None,
            technician: None,
            notes: None,
            photos: Vec::new(),
            updated_at: now,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == StepStatus::Completed
    }
}
