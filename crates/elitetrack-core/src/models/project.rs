//! Project model definition and related functionality.

use jiff::{civil::Date, Timestamp};
use serde::{Deserialize, Serialize};

use super::{ProjectStatus, RecordId, StepStatus, TimelineStep};

/// An armoring project for one vehicle, with its ordered timeline.
///
/// The client and vehicle are referenced by id; resolve them through a
/// [`DirectoryLookup`](crate::gateway::DirectoryLookup).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectRecord {
    /// Unique identifier for the project
    pub id: RecordId,

    /// Owning client
    pub client_id: RecordId,

    /// Vehicle being armored
    pub vehicle_id: RecordId,

    /// Code printed on the vehicle's QR tag
    pub qr_code: String,

    /// Aggregate status derived from the timeline
    #[serde(default)]
    pub status: ProjectStatus,

    /// Aggregate progress in percent (0-100)
    #[serde(default)]
    pub progress: u8,

    /// Ordered timeline steps
    #[serde(default)]
    pub timeline: Vec<TimelineStep>,

    /// Date work started
    pub start_date: Option<Date>,

    /// Promised delivery date
    pub estimated_delivery: Option<Date>,

    /// When the vehicle was actually delivered (UTC)
    pub actual_delivery: Option<Timestamp>,

    /// Timestamp when the project was created (UTC)
    pub created_at: Timestamp,

    /// Timestamp when the project was last modified (UTC)
    pub updated_at: Timestamp,
}

impl ProjectRecord {
    /// Index of the step with the given id.
    pub fn step_index(&self, step_id: &RecordId) -> Option<usize> {
        self.timeline.iter().position(|s| &s.id == step_id)
    }

    pub fn step(&self, step_id: &RecordId) -> Option<&TimelineStep> {
        self.timeline.iter().find(|s| &s.id == step_id)
    }

    /// Number of completed steps.
    pub fn completed_steps(&self) -> usize {
        self.timeline.iter().filter(|s| s.is_completed()).count()
    }

    /// The step currently being worked on, if any.
    pub fn current_step(&self) -> Option<&TimelineStep> {
        self.timeline
            .iter()
            .find(|s| s.status == StepStatus::InProgress)
    }

    pub fn is_locked(&self) -> bool {
        self.status.is_locked()
    }
}
