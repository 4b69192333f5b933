//! Sequential workflow gating for a project's timeline.
//!
//! Every function here is pure: it takes the current [`ProjectRecord`] and
//! returns a new one, or an error with nothing changed. Guards run in a fixed
//! order (actor, project lock, step lookup, step state, gating, forecast
//! date), so the first failing rule decides the error.
//!
//! Steps move `pending → in_progress → completed`. A step may start only when
//! it is first or its predecessor is completed. Reopening a completed step is
//! the only backward move. Once the project is `completed` or `delivered` no
//! step may change.

use jiff::{civil::Date, Timestamp};

use crate::{
    error::{Result, TrackerError},
    models::{Actor, ProjectRecord, ProjectStatus, RecordId, StepStatus, TimelineStep},
};

#[cfg(test)]
mod tests;

/// Stages used when a project is created without an explicit timeline.
pub const DEFAULT_STAGES: &[(&str, &str)] = &[
    ("Vehicle check-in", "Vehicle received, documented and inspected with a full photo record."),
    ("Disassembly", "Interior panels, linings, seats and trim removed to reach the armoring areas."),
    ("Glass installation", "Certified ballistic glass installed to the contracted protection level."),
    ("Opaque armoring", "Aramid blankets and ballistic steel fitted to doors, pillars, roof and floor."),
    ("Reassembly", "Interior components, linings and electrical systems put back in place."),
    ("Finishing", "Seals, rubbers, door and window alignment adjusted."),
    ("Inspection", "Quality inspection by a certified technical supervisor."),
    ("Armoring report", "Technical report issued with materials, batches and certifications."),
    ("Road tests", "Driving tests plus power windows, locks and safety systems checked."),
    ("Cleaning", "Full interior and exterior cleaning and polishing."),
    ("Ready for delivery", "Paperwork prepared and hand-over scheduled with the client."),
];

/// Editable free-form fields of a step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepFields {
    pub description: Option<String>,
    pub notes: Option<String>,
    pub technician: Option<String>,
}

impl StepFields {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.notes.is_none() && self.technician.is_none()
    }
}

/// Progress in percent, rounding half up.
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((200 * completed + total) / (2 * total)).min(100) as u8
}

/// Recomputes `progress` and `status` from the timeline.
///
/// A delivered project stays delivered.
pub fn recompute(project: &mut ProjectRecord) {
    let total = project.timeline.len();
    let completed = project.completed_steps();
    project.progress = progress_percent(completed, total);
    if project.status == ProjectStatus::Delivered {
        return;
    }
    project.status = if total > 0 && completed == total {
        ProjectStatus::Completed
    } else if completed > 0 {
        ProjectStatus::InProgress
    } else {
        ProjectStatus::Pending
    };
}

/// True iff the step at `index` is first or its predecessor is completed.
pub fn can_start(project: &ProjectRecord, index: usize) -> bool {
    index == 0
        || project
            .timeline
            .get(index - 1)
            .is_some_and(TimelineStep::is_completed)
}

fn ensure_staff(actor: &Actor) -> Result<()> {
    if actor.is_staff() {
        Ok(())
    } else {
        Err(TrackerError::guard(format!(
            "{} '{}' cannot change the timeline",
            actor.role.as_str(),
            actor.id
        )))
    }
}

fn ensure_unlocked(project: &ProjectRecord) -> Result<()> {
    if project.is_locked() {
        Err(TrackerError::guard(format!(
            "project {} is {} and no longer accepts step changes",
            project.id,
            project.status.as_str()
        )))
    } else {
        Ok(())
    }
}

fn locate(project: &ProjectRecord, step_id: &RecordId) -> Result<usize> {
    project
        .step_index(step_id)
        .ok_or_else(|| TrackerError::not_found("step", step_id))
}

fn ensure_gate(project: &ProjectRecord, index: usize) -> Result<()> {
    if can_start(project, index) {
        Ok(())
    } else {
        let previous = &project.timeline[index - 1];
        Err(TrackerError::guard(format!(
            "step '{}' cannot start before '{}' is completed",
            project.timeline[index].title, previous.title
        )))
    }
}

/// Checks that `actor` may change step `step_id` of `project` and returns
/// its index. Runs the actor, lock and lookup guards in that order.
pub fn editable_step(project: &ProjectRecord, step_id: &RecordId, actor: &Actor) -> Result<usize> {
    ensure_staff(actor)?;
    ensure_unlocked(project)?;
    locate(project, step_id)
}

/// Moves a pending step to `in_progress`.
pub fn start_step(
    project: &ProjectRecord,
    step_id: &RecordId,
    actor: &Actor,
    now: Timestamp,
) -> Result<ProjectRecord> {
    let index = editable_step(project, step_id, actor)?;
    let step = &project.timeline[index];
    if step.status != StepStatus::Pending {
        return Err(TrackerError::guard(format!(
            "step '{}' is already {}",
            step.title,
            step.status.as_str()
        )));
    }
    ensure_gate(project, index)?;

    let mut next = project.clone();
    let step = &mut next.timeline[index];
    step.status = StepStatus::InProgress;
    step.updated_at = now;
    next.updated_at = now;
    recompute(&mut next);
    Ok(next)
}

/// Completes a step, stamping `completion_date` and forwarding `forecast` to
/// the next step's `estimated_date`.
///
/// A forecast on or after `today` is mandatory whenever a next step exists and
/// ignored for the last step. Completing a pending step that passes the gate
/// starts and finishes it in one move.
pub fn request_completion(
    project: &ProjectRecord,
    step_id: &RecordId,
    forecast: Option<Date>,
    actor: &Actor,
    today: Date,
    now: Timestamp,
) -> Result<ProjectRecord> {
    let index = editable_step(project, step_id, actor)?;
    let step = &project.timeline[index];
    if step.is_completed() {
        return Err(TrackerError::guard(format!(
            "step '{}' is already completed",
            step.title
        )));
    }
    if step.status == StepStatus::Pending {
        ensure_gate(project, index)?;
    }

    let has_next = index + 1 < project.timeline.len();
    if has_next {
        match forecast {
            None => {
                return Err(TrackerError::validation("forecast_date")
                    .with_reason("a forecast date for the next step is required"))
            }
            Some(date) if date < today => {
                return Err(TrackerError::validation("forecast_date")
                    .with_reason(format!("{date} is in the past (today is {today})")))
            }
            Some(_) => {}
        }
    }

    let mut next = project.clone();
    {
        let step = &mut next.timeline[index];
        step.status = StepStatus::Completed;
        step.completion_date = Some(now);
        step.updated_at = now;
    }
    if has_next {
        let following = &mut next.timeline[index + 1];
        following.estimated_date = forecast;
        following.updated_at = now;
    }
    next.updated_at = now;
    recompute(&mut next);
    Ok(next)
}

/// Updates the free-form fields of a step while the project is unlocked.
pub fn edit_step_fields(
    project: &ProjectRecord,
    step_id: &RecordId,
    fields: &StepFields,
    actor: &Actor,
    now: Timestamp,
) -> Result<ProjectRecord> {
    let index = editable_step(project, step_id, actor)?;

    let mut next = project.clone();
    let step = &mut next.timeline[index];
    if let Some(description) = &fields.description {
        step.description = Some(description.clone());
    }
    if let Some(notes) = &fields.notes {
        step.notes = Some(notes.clone());
    }
    if let Some(technician) = &fields.technician {
        step.technician = Some(technician.clone());
    }
    step.updated_at = now;
    next.updated_at = now;
    Ok(next)
}

/// Moves a completed step back to `in_progress`.
///
/// The completion date is cleared. Forecast dates of later steps stay as
/// they are.
pub fn reopen_step(
    project: &ProjectRecord,
    step_id: &RecordId,
    actor: &Actor,
    now: Timestamp,
) -> Result<ProjectRecord> {
    let index = editable_step(project, step_id, actor)?;
    let step = &project.timeline[index];
    if !step.is_completed() {
        return Err(TrackerError::guard(format!(
            "step '{}' is {} and cannot be reopened",
            step.title,
            step.status.as_str()
        )));
    }

    let mut next = project.clone();
    let step = &mut next.timeline[index];
    step.status = StepStatus::InProgress;
    step.completion_date = None;
    step.updated_at = now;
    next.updated_at = now;
    recompute(&mut next);
    Ok(next)
}

/// Adds a photo URL to a step. Adding a URL already present is a no-op.
pub fn add_photo(
    project: &ProjectRecord,
    step_id: &RecordId,
    url: &str,
    actor: &Actor,
    now: Timestamp,
) -> Result<ProjectRecord> {
    let index = editable_step(project, step_id, actor)?;
    if project.timeline[index].photos.iter().any(|p| p == url) {
        return Ok(project.clone());
    }

    let mut next = project.clone();
    let step = &mut next.timeline[index];
    step.photos.push(url.to_string());
    step.updated_at = now;
    next.updated_at = now;
    Ok(next)
}

/// Hands a completed project back to its client.
pub fn mark_delivered(
    project: &ProjectRecord,
    actor: &Actor,
    now: Timestamp,
) -> Result<ProjectRecord> {
    ensure_staff(actor)?;
    if project.status != ProjectStatus::Completed {
        return Err(TrackerError::guard(format!(
            "project {} is {}; only completed projects can be delivered",
            project.id,
            project.status.as_str()
        )));
    }

    let mut next = project.clone();
    next.status = ProjectStatus::Delivered;
    next.actual_delivery = Some(now);
    next.updated_at = now;
    Ok(next)
}
