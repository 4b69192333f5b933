//! Project and timeline step queries.

use jiff::Timestamp;
use rusqlite::{params, OptionalExtension};

use super::utils::{
    canonical_id, opt_date, opt_string, opt_timestamp, parsed, row_id, string_list, timestamp,
};
use crate::{
    error::{DatabaseResultExt, Result, TrackerError},
    models::{IdKind, ProjectFilter, ProjectPatch, ProjectRecord, RecordId, StepPatch, TimelineStep},
    timeline,
};

const CHECK_QR_CODE_SQL: &str = "SELECT EXISTS(SELECT 1 FROM projects WHERE qr_code = ?1)";
const INSERT_PROJECT_SQL: &str = "INSERT INTO projects (client_id, vehicle_id, qr_code, status, progress, start_date, estimated_delivery, actual_delivery, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";
const INSERT_STEP_SQL: &str = "INSERT INTO steps (project_id, position, title, description, status, estimated_date, completion_date, notes, photos, updated_at, technician) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";
const SELECT_PROJECT_SQL: &str = "SELECT id, client_id, vehicle_id, qr_code, status, progress, start_date, estimated_delivery, actual_delivery, created_at, updated_at FROM projects WHERE id = ?1";
const SELECT_PROJECTS_SQL: &str = "SELECT id, client_id, vehicle_id, qr_code, status, progress, start_date, estimated_delivery, actual_delivery, created_at, updated_at FROM projects WHERE (?1 IS NULL OR client_id = ?1) AND (?2 IS NULL OR qr_code = ?2) ORDER BY created_at, id";
const SELECT_STEPS_BY_PROJECT_SQL: &str = "SELECT id, project_id, position, title, description, status, estimated_date, completion_date, notes, photos, updated_at, technician FROM steps WHERE project_id = ?1 ORDER BY position";
const SELECT_STEP_SQL: &str = "SELECT id, project_id, position, title, description, status, estimated_date, completion_date, notes, photos, updated_at, technician FROM steps WHERE id = ?1";
const UPDATE_PROJECT_SQL: &str = "UPDATE projects SET status = ?1, progress = ?2, estimated_delivery = ?3, actual_delivery = ?4, updated_at = ?5 WHERE id = ?6";
const UPDATE_STEP_SQL: &str = "UPDATE steps SET status = ?1, estimated_date = ?2, completion_date = ?3, description = ?4, notes = ?5, technician = ?6, photos = ?7, updated_at = ?8 WHERE id = ?9";
const UPDATE_PROJECT_TIMESTAMP_SQL: &str = "UPDATE projects SET updated_at = ?1 WHERE id = ?2";

impl super::Database {
    /// Helper function to construct a project (without its steps) from a row
    fn build_project_from_row(row: &rusqlite::Row) -> rusqlite::Result<ProjectRecord> {
        Ok(ProjectRecord {
            id: canonical_id(row, 0, IdKind::Project)?,
            client_id: RecordId::new(row.get::<_, String>(1)?),
            vehicle_id: RecordId::new(row.get::<_, String>(2)?),
            qr_code: row.get(3)?,
            status: parsed(row, 4)?,
            progress: row.get::<_, i64>(5)?.clamp(0, 100) as u8,
            timeline: Vec::new(),
            start_date: opt_date(row, 6)?,
            estimated_delivery: opt_date(row, 7)?,
            actual_delivery: opt_timestamp(row, 8)?,
            created_at: timestamp(row, 9)?,
            updated_at: timestamp(row, 10)?,
        })
    }

    /// Helper function to construct a TimelineStep from a database row
    fn build_step_from_row(row: &rusqlite::Row) -> rusqlite::Result<TimelineStep> {
        Ok(TimelineStep {
            id: canonical_id(row, 0, IdKind::Step)?,
            project_id: canonical_id(row, 1, IdKind::Project)?,
            position: row.get::<_, i64>(2)? as u32,
            title: row.get(3)?,
            description: row.get(4)?,
            status: parsed(row, 5)?,
            estimated_date: opt_date(row, 6)?,
            completion_date: opt_timestamp(row, 7)?,
            notes: row.get(8)?,
            photos: string_list(row, 9)?,
            updated_at: timestamp(row, 10)?,
            technician: row.get(11)?,
        })
    }

    fn load_steps(&self, project_id: i64) -> Result<Vec<TimelineStep>> {
        let mut stmt = self
            .connection
            .prepare(SELECT_STEPS_BY_PROJECT_SQL)
            .db_context("Failed to prepare query")?;

        let steps = stmt
            .query_map(params![project_id], Self::build_step_from_row)
            .db_context("Failed to query steps")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .db_context("Failed to fetch steps")?;

        Ok(steps)
    }

    /// Stores a new project and its timeline, returning the stored record.
    ///
    /// Progress and status are recomputed from the timeline; timestamps are
    /// assigned here.
    pub fn insert_project(&mut self, draft: &ProjectRecord) -> Result<ProjectRecord> {
        let tx = self
            .connection
            .transaction()
            .db_context("Failed to begin transaction")?;

        let taken: bool = tx
            .query_row(CHECK_QR_CODE_SQL, params![draft.qr_code], |row| row.get(0))
            .db_context("Failed to check QR code")?;
        if taken {
            return Err(TrackerError::validation("qr_code")
                .with_reason(format!("'{}' is already assigned", draft.qr_code)));
        }

        let mut computed = draft.clone();
        timeline::recompute(&mut computed);
        let now_str = Timestamp::now().to_string();

        tx.execute(
            INSERT_PROJECT_SQL,
            params![
                draft.client_id.as_str(),
                draft.vehicle_id.as_str(),
                draft.qr_code,
                computed.status.as_str(),
                computed.progress as i64,
                opt_string(draft.start_date),
                opt_string(draft.estimated_delivery),
                opt_string(draft.actual_delivery),
                &now_str,
                &now_str
            ],
        )
        .db_context("Failed to insert project")?;
        let project_id = tx.last_insert_rowid();

        for (position, step) in draft.timeline.iter().enumerate() {
            let photos = serde_json::to_string(&step.photos)?;
            tx.execute(
                INSERT_STEP_SQL,
                params![
                    project_id,
                    position as i64,
                    step.title,
                    step.description,
                    step.status.as_str(),
                    opt_string(step.estimated_date),
                    opt_string(step.completion_date),
                    step.notes,
                    photos,
                    &now_str,
                    step.technician
                ],
            )
            .db_context("Failed to insert step")?;
        }

        tx.commit().db_context("Failed to commit transaction")?;

        self.get_project(project_id)?
            .ok_or_else(|| TrackerError::not_found("project", RecordId::canonical(IdKind::Project, project_id)))
    }

    /// Retrieves a project with its timeline.
    pub fn get_project(&self, id: i64) -> Result<Option<ProjectRecord>> {
        let project = self
            .connection
            .query_row(SELECT_PROJECT_SQL, params![id], Self::build_project_from_row)
            .optional()
            .db_context("Failed to get project")?;

        match project {
            Some(mut project) => {
                project.timeline = self.load_steps(id)?;
                Ok(Some(project))
            }
            None => Ok(None),
        }
    }

    /// Lists projects matching the filter, oldest first.
    pub fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<ProjectRecord>> {
        let mut stmt = self
            .connection
            .prepare(SELECT_PROJECTS_SQL)
            .db_context("Failed to prepare query")?;

        let projects = stmt
            .query_map(
                params![
                    filter.client_id.as_ref().map(RecordId::as_str),
                    filter.qr_code
                ],
                Self::build_project_from_row,
            )
            .db_context("Failed to query projects")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .db_context("Failed to fetch projects")?;

        projects
            .into_iter()
            .map(|mut project| {
                let id = row_id(IdKind::Project, &project.id)?;
                project.timeline = self.load_steps(id)?;
                Ok(project)
            })
            .collect()
    }

    /// Applies a patch to the project's aggregate fields and returns the
    /// stored record.
    pub fn update_project(&mut self, id: &RecordId, patch: &ProjectPatch) -> Result<ProjectRecord> {
        let row = row_id(IdKind::Project, id)?;
        let mut project = self
            .get_project(row)?
            .ok_or_else(|| TrackerError::not_found("project", id))?;

        if let Some(status) = patch.status {
            project.status = status;
        }
        if let Some(progress) = patch.progress {
            project.progress = progress;
        }
        if let Some(date) = patch.estimated_delivery {
            project.estimated_delivery = date;
        }
        if let Some(ts) = patch.actual_delivery {
            project.actual_delivery = ts;
        }
        project.updated_at = Timestamp::now();

        self.connection
            .execute(
                UPDATE_PROJECT_SQL,
                params![
                    project.status.as_str(),
                    project.progress as i64,
                    opt_string(project.estimated_delivery),
                    opt_string(project.actual_delivery),
                    project.updated_at.to_string(),
                    row
                ],
            )
            .db_context("Failed to update project")?;

        Ok(project)
    }

    /// Applies a patch to one step and returns the owning project as stored.
    pub fn update_step(&mut self, id: &RecordId, patch: &StepPatch) -> Result<ProjectRecord> {
        let step_row = row_id(IdKind::Step, id)?;
        let tx = self
            .connection
            .transaction()
            .db_context("Failed to begin transaction")?;

        let mut step = tx
            .query_row(SELECT_STEP_SQL, params![step_row], Self::build_step_from_row)
            .optional()
            .db_context("Failed to get current step")?
            .ok_or_else(|| TrackerError::not_found("step", id))?;

        patch.apply_to(&mut step);
        let now_str = Timestamp::now().to_string();
        let photos = serde_json::to_string(&step.photos)?;
        let project_row = row_id(IdKind::Project, &step.project_id)?;

        tx.execute(
            UPDATE_STEP_SQL,
            params![
                step.status.as_str(),
                opt_string(step.estimated_date),
                opt_string(step.completion_date),
                step.description,
                step.notes,
                step.technician,
                photos,
                &now_str,
                step_row
            ],
        )
        .db_context("Failed to update step")?;

        tx.execute(UPDATE_PROJECT_TIMESTAMP_SQL, params![&now_str, project_row])
            .db_context("Failed to update project timestamp")?;

        tx.commit().db_context("Failed to commit transaction")?;

        self.get_project(project_row)?
            .ok_or_else(|| TrackerError::not_found("project", &step.project_id))
    }
}
