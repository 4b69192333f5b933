//! Partial updates sent to the persistence gateway.
//!
//! Patches are derived by diffing a record before and after a local mutation,
//! so only fields that actually changed travel to the store. A field set to
//! `Some(None)` clears the stored value.

use jiff::{civil::Date, Timestamp};

use super::{
    MessageRecord, ProjectRecord, ProjectStatus, QuoteRecord, QuoteStatus, RecordId, StepStatus,
    TimelineStep,
};

fn changed<T: Clone + PartialEq>(before: &T, after: &T) -> Option<T> {
    (before != after).then(|| after.clone())
}

/// Changed fields of a timeline step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepPatch {
    pub status: Option<StepStatus>,
    pub estimated_date: Option<Option<Date>>,
    pub completion_date: Option<Option<Timestamp>>,
    pub description: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub technician: Option<Option<String>>,
    pub photos: Option<Vec<String>>,
}

impl StepPatch {
    pub fn diff(before: &TimelineStep, after: &TimelineStep) -> Self {
        Self {
            status: changed(&before.status, &after.status),
            estimated_date: changed(&before.estimated_date, &after.estimated_date),
            completion_date: changed(&before.completion_date, &after.completion_date),
            description: changed(&before.description, &after.description),
            notes: changed(&before.notes, &after.notes),
            technician: changed(&before.technician, &after.technician),
            photos: changed(&before.photos, &after.photos),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Writes the patched fields onto `step`.
    pub fn apply_to(&self, step: &mut TimelineStep) {
        if let Some(status) = self.status {
            step.status = status;
        }
        if let Some(date) = self.estimated_date {
            step.estimated_date = date;
        }
        if let Some(ts) = self.completion_date {
            step.completion_date = ts;
        }
        if let Some(description) = &self.description {
            step.description = description.clone();
        }
        if let Some(notes) = &self.notes {
            step.notes = notes.clone();
        }
        if let Some(technician) = &self.technician {
            step.technician = technician.clone();
        }
        if let Some(photos) = &self.photos {
            step.photos = photos.clone();
        }
    }
}

/// Changed aggregate fields of a project.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectPatch {
    pub status: Option<ProjectStatus>,
    pub progress: Option<u8>,
    pub estimated_delivery: Option<Option<Date>>,
    pub actual_delivery: Option<Option<Timestamp>>,
}

impl ProjectPatch {
    pub fn diff(before: &ProjectRecord, after: &ProjectRecord) -> Self {
        Self {
            status: changed(&before.status, &after.status),
            progress: changed(&before.progress, &after.progress),
            estimated_delivery: changed(&before.estimated_delivery, &after.estimated_delivery),
            actual_delivery: changed(&before.actual_delivery, &after.actual_delivery),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Writes the patched fields onto `project`.
    pub fn apply_to(&self, project: &mut ProjectRecord) {
        if let Some(status) = self.status {
            project.status = status;
        }
        if let Some(progress) = self.progress {
            project.progress = progress;
        }
        if let Some(date) = self.estimated_delivery {
            project.estimated_delivery = date;
        }
        if let Some(ts) = self.actual_delivery {
            project.actual_delivery = ts;
        }
    }
}

/// Changed fields of a message. Only the read flag is mutable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePatch {
    pub read: Option<bool>,
}

impl MessagePatch {
    pub fn diff(before: &MessageRecord, after: &MessageRecord) -> Self {
        Self {
            read: changed(&before.read, &after.read),
        }
    }

    pub fn apply_to(&self, message: &mut MessageRecord) {
        if let Some(read) = self.read {
            message.read = read;
        }
    }
}

/// Changed fields of a quote.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuotePatch {
    pub status: Option<QuoteStatus>,
    pub project_id: Option<Option<RecordId>>,
    pub estimated_price: Option<Option<f64>>,
    pub estimated_days: Option<Option<u32>>,
    pub executor_notes: Option<Option<String>>,
    pub executor_id: Option<Option<RecordId>>,
    pub executor_name: Option<Option<String>>,
    pub responded_at: Option<Option<Timestamp>>,
    pub client_response: Option<Option<String>>,
    pub approved_at: Option<Option<Timestamp>>,
    pub rejected_at: Option<Option<Timestamp>>,
}

impl QuotePatch {
    pub fn diff(before: &QuoteRecord, after: &QuoteRecord) -> Self {
        Self {
            status: changed(&before.status, &after.status),
            project_id: changed(&before.project_id, &after.project_id),
            estimated_price: changed(&before.estimated_price, &after.estimated_price),
            estimated_days: changed(&before.estimated_days, &after.estimated_days),
            executor_notes: changed(&before.executor_notes, &after.executor_notes),
            executor_id: changed(&before.executor_id, &after.executor_id),
            executor_name: changed(&before.executor_name, &after.executor_name),
            responded_at: changed(&before.responded_at, &after.responded_at),
            client_response: changed(&before.client_response, &after.client_response),
            approved_at: changed(&before.approved_at, &after.approved_at),
            rejected_at: changed(&before.rejected_at, &after.rejected_at),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Writes the patched fields onto `quote`.
    pub fn apply_to(&self, quote: &mut QuoteRecord) {
        if let Some(status) = self.status {
            quote.status = status;
        }
        if let Some(project_id) = &self.project_id {
            quote.project_id = project_id.clone();
        }
        if let Some(price) = self.estimated_price {
            quote.estimated_price = price;
        }
        if let Some(days) = self.estimated_days {
            quote.estimated_days = days;
        }
        if let Some(notes) = &self.executor_notes {
            quote.executor_notes = notes.clone();
        }
        if let Some(executor_id) = &self.executor_id {
            quote.executor_id = executor_id.clone();
        }
        if let Some(name) = &self.executor_name {
            quote.executor_name = name.clone();
        }
        if let Some(ts) = self.responded_at {
            quote.responded_at = ts;
        }
        if let Some(response) = &self.client_response {
            quote.client_response = response.clone();
        }
        if let Some(ts) = self.approved_at {
            quote.approved_at = ts;
        }
        if let Some(ts) = self.rejected_at {
            quote.rejected_at = ts;
        }
    }
}
