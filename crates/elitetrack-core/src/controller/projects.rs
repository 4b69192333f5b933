//! Project and timeline operations.

use jiff::civil::Date;
use log::debug;

use super::{
    outbox::{PendingWrite, WriteJob},
    state::{Action, Entity},
    ProjectStateController,
};
use crate::{
    blob::step_photo_path,
    error::{Result, TrackerError},
    gateway::dto::checked_all,
    models::{
        IdKind, ProjectFilter, ProjectPatch, ProjectRecord, ProjectStatus, RecordId, StepPatch,
        TimelineStep,
    },
    params::NewProject,
    reconcile::IdAliases,
    timeline::{self, StepFields, DEFAULT_STAGES},
};

impl ProjectStateController {
    /// Creates a project with a pending timeline.
    ///
    /// The project appears in the state immediately under a provisional id.
    /// Without explicit step titles the default stages are used.
    ///
    /// # Errors
    ///
    /// * `TrackerError::GuardViolation` - When the actor is not staff
    /// * `TrackerError::Validation` - When the parameters are invalid or the
    ///   QR code is already in use
    pub async fn create_project(&self, params: NewProject) -> Result<PendingWrite> {
        let actor = self.actor();
        if !actor.is_staff() {
            return Err(TrackerError::guard(format!(
                "{} '{}' cannot create projects",
                actor.role.as_str(),
                actor.id
            )));
        }
        params.validate()?;

        let now = self.now();
        let ids = &self.inner.ids;
        let id = ids.next(IdKind::Project, now);
        let stages: Vec<(String, Option<String>)> = if params.steps.is_empty() {
            DEFAULT_STAGES
                .iter()
                .map(|(title, description)| (title.to_string(), Some(description.to_string())))
                .collect()
        } else {
            params
                .steps
                .iter()
                .map(|title| (title.trim().to_string(), None))
                .collect()
        };
        let timeline = stages
            .into_iter()
            .enumerate()
            .map(|(position, (title, description))| TimelineStep {
                description,
                ..TimelineStep::new(
                    ids.next(IdKind::Step, now),
                    id.clone(),
                    position as u32,
                    title,
                    now,
                )
            })
            .collect();

        let mut project = ProjectRecord {
            id: id.clone(),
            client_id: params.client_id,
            vehicle_id: params.vehicle_id,
            qr_code: params.qr_code.trim().to_string(),
            status: ProjectStatus::Pending,
            progress: 0,
            timeline,
            start_date: params.start_date,
            estimated_delivery: params.estimated_delivery,
            actual_delivery: None,
            created_at: now,
            updated_at: now,
        };
        timeline::recompute(&mut project);

        let (pending, changed) = self.inner.shared.update(|state| {
            if state.projects.iter().any(|p| p.qr_code == project.qr_code) {
                return Err(TrackerError::validation("qr_code")
                    .with_reason(format!("'{}' is already in use", project.qr_code)));
            }
            let pending = self.inner.outbox.enqueue(WriteJob::CreateProject { id: id.clone() });
            Ok((Some(Action::Optimistic(Entity::Project(project))), pending))
        })?;
        debug!("created project {id}");
        self.inner.shared.persist(changed).await;
        Ok(pending)
    }

    /// Applies a pure timeline transition to one project and queues the
    /// resulting patches. Step ids handed to the transition must go through
    /// the aliases, since callers may still hold provisional ones.
    async fn mutate_project(
        &self,
        project_id: &RecordId,
        transition: impl FnOnce(&ProjectRecord, &IdAliases) -> Result<ProjectRecord>,
    ) -> Result<PendingWrite> {
        let (pending, changed) = self.inner.shared.update(|state| {
            let before = state
                .project(project_id)
                .ok_or_else(|| TrackerError::not_found("project", project_id))?;
            let after = transition(before, &state.aliases)?;
            if after == *before {
                return Ok((None, PendingWrite::settled_now(before.id.clone())));
            }

            let steps = before
                .timeline
                .iter()
                .zip(&after.timeline)
                .filter_map(|(old, new)| {
                    let patch = StepPatch::diff(old, new);
                    (!patch.is_empty()).then(|| (new.id.clone(), patch))
                })
                .collect();
            let pending = self.inner.outbox.enqueue(WriteJob::UpdateProject {
                id: before.id.clone(),
                steps,
                project: ProjectPatch::diff(before, &after),
            });
            Ok((Some(Action::Replace(Entity::Project(after))), pending))
        })?;
        self.inner.shared.persist(changed).await;
        Ok(pending)
    }

    /// Moves a pending step to `in_progress`, enforcing the gate.
    pub async fn start_step(&self, project_id: &RecordId, step_id: &RecordId) -> Result<PendingWrite> {
        let (actor, now) = (self.actor(), self.now());
        self.mutate_project(project_id, |p, aliases| {
            timeline::start_step(p, aliases.resolve(step_id), actor, now)
        })
        .await
    }

    /// Completes a step. `forecast` becomes the next step's estimated date and
    /// is required unless the step is the last one.
    pub async fn complete_step(
        &self,
        project_id: &RecordId,
        step_id: &RecordId,
        forecast: Option<Date>,
    ) -> Result<PendingWrite> {
        let (actor, now, today) = (self.actor(), self.now(), self.inner.clock.today());
        self.mutate_project(project_id, |p, aliases| {
            let step_id = aliases.resolve(step_id);
            timeline::request_completion(p, step_id, forecast, actor, today, now)
        })
        .await
    }

    pub async fn edit_step(
        &self,
        project_id: &RecordId,
        step_id: &RecordId,
        fields: &StepFields,
    ) -> Result<PendingWrite> {
        let (actor, now) = (self.actor(), self.now());
        self.mutate_project(project_id, |p, aliases| {
            timeline::edit_step_fields(p, aliases.resolve(step_id), fields, actor, now)
        })
        .await
    }

    /// Moves a completed step back to `in_progress`.
    pub async fn reopen_step(&self, project_id: &RecordId, step_id: &RecordId) -> Result<PendingWrite> {
        let (actor, now) = (self.actor(), self.now());
        self.mutate_project(project_id, |p, aliases| {
            timeline::reopen_step(p, aliases.resolve(step_id), actor, now)
        })
        .await
    }

    pub async fn mark_delivered(&self, project_id: &RecordId) -> Result<PendingWrite> {
        let (actor, now) = (self.actor(), self.now());
        self.mutate_project(project_id, |p, _| timeline::mark_delivered(p, actor, now))
            .await
    }

    /// Uploads a photo through the blob store and adds its URL to the step.
    ///
    /// Guards run before the upload, so a rejected step never stores a file.
    ///
    /// # Errors
    ///
    /// * `TrackerError::Configuration` - When no blob store is configured
    /// * `TrackerError::PersistenceFailure` - When the upload fails
    /// * the timeline guard errors of [`timeline::editable_step`]
    pub async fn upload_step_photo(
        &self,
        project_id: &RecordId,
        step_id: &RecordId,
        bytes: Vec<u8>,
        file_name: &str,
    ) -> Result<PendingWrite> {
        let blobs = self
            .inner
            .blobs
            .as_ref()
            .ok_or_else(|| TrackerError::Configuration {
                message: "no blob store configured".to_string(),
            })?;
        let actor = self.actor();
        let step_key = self.inner.shared.read(|state| {
            let project = state
                .project(project_id)
                .ok_or_else(|| TrackerError::not_found("project", project_id))?;
            let step_id = state.aliases.resolve(step_id);
            timeline::editable_step(project, step_id, actor)?;
            Ok::<_, TrackerError>(step_id.clone())
        })?;

        let now = self.now();
        let path = step_photo_path(step_key.as_str(), now.as_millisecond(), file_name);
        let url = blobs
            .upload(bytes, &path)
            .await
            .map_err(|e| e.into_persistence("upload photo"))?;
        debug!("uploaded {path} as {url}");

        self.mutate_project(project_id, |p, aliases| {
            timeline::add_photo(p, aliases.resolve(step_id), &url, actor, now)
        })
        .await
    }

    /// Looks up a project by id.
    pub fn project(&self, id: &RecordId) -> Result<ProjectRecord> {
        self.inner
            .shared
            .read(|s| s.project(id).cloned())
            .ok_or_else(|| TrackerError::not_found("project", id))
    }

    /// Every project in the session, in collection order.
    pub fn projects(&self) -> Vec<ProjectRecord> {
        self.inner.shared.read(|s| s.projects.to_vec())
    }

    pub fn projects_for_client(&self, client_id: &RecordId) -> Vec<ProjectRecord> {
        self.inner.shared.read(|s| {
            s.projects
                .iter()
                .filter(|p| &p.client_id == client_id)
                .cloned()
                .collect()
        })
    }

    /// Finds a project by the code on its QR tag.
    ///
    /// Falls back to the gateway when the project is not in the session yet
    /// and merges what the store returns.
    pub async fn project_by_qr(&self, qr_code: &str) -> Result<ProjectRecord> {
        let qr_code = qr_code.trim();
        let local = self
            .inner
            .shared
            .read(|s| s.projects.iter().find(|p| p.qr_code == qr_code).cloned());
        if let Some(project) = local {
            return Ok(project);
        }

        let Some(gateway) = &self.inner.gateway else {
            return Err(TrackerError::not_found("project", qr_code));
        };
        let filter = ProjectFilter {
            qr_code: Some(qr_code.to_string()),
            ..Default::default()
        };
        let found = gateway
            .query_projects(&filter)
            .await
            .map_err(|e| e.into_persistence("query projects"))?;
        let found = checked_all("query projects", found)?;
        let Some(project) = found.into_iter().next() else {
            return Err(TrackerError::not_found("project", qr_code));
        };

        let (changed, _) = self
            .inner
            .shared
            .dispatch(Action::Pushed(Entity::Project(project.clone())));
        self.inner.shared.persist(changed).await;
        Ok(project)
    }

    /// Projects owned by the client registered under `email`.
    pub async fn projects_for_email(&self, email: &str) -> Result<Vec<ProjectRecord>> {
        let client = self
            .directory()?
            .client_by_email(email)
            .await
            .map_err(|e| e.into_persistence("look up client"))?
            .ok_or_else(|| TrackerError::not_found("client", email))?;
        Ok(self.projects_for_client(&client.id))
    }

    /// Focuses a project, or clears the focus with `None`.
    pub fn select_project(&self, id: Option<&RecordId>) -> Result<()> {
        let id = match id {
            Some(id) => Some(self.project(id)?.id),
            None => None,
        };
        self.inner.shared.dispatch(Action::Select(id));
        Ok(())
    }

    pub fn selected_project(&self) -> Option<ProjectRecord> {
        self.inner.shared.read(|s| {
            s.selected_project
                .as_ref()
                .and_then(|id| s.project(id))
                .cloned()
        })
    }
}
