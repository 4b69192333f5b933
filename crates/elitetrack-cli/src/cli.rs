//! Command handlers.
//!
//! Every handler runs one user intent through the controller, waits for the
//! store's answer and renders the result through the core `Display`
//! implementations.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use anyhow::{bail, Context, Result};
use elitetrack_core::{
    display::{CreateResult, Messages, Persistence, ProjectSummaries, Quotes, UpdateResult},
    models::{ProjectRecord, QuoteRecord, QuoteStatus, RecordId, Role, Vehicle},
    timeline::StepFields,
    Notice, PendingWrite, ProjectStateController, SqliteGateway,
};
use log::debug;
use tokio::sync::broadcast;

use crate::{
    args::{
        AddClientArgs, AddVehicleArgs, AnswerQuoteArgs, ChatCommands, ClientCommands,
        CompleteStepArgs, EditStepArgs, ListProjectsArgs, ListQuotesArgs, ProjectCommands,
        ProjectRefArgs, QuoteCommands, RequestQuoteArgs, SendQuoteArgs, StepCommands,
        StepPhotoArgs, StepRefArgs, VehicleCommands,
    },
    renderer::TerminalRenderer,
};

/// True for failure notices the command has not already returned as its
/// error.
fn needs_warning(notice: &Notice, failed: &[RecordId]) -> bool {
    notice.is_failure() && !notice.id.as_ref().is_some_and(|id| failed.contains(id))
}

pub struct Cli {
    controller: ProjectStateController,
    store: Option<Arc<SqliteGateway>>,
    renderer: TerminalRenderer,
    notices: broadcast::Receiver<Notice>,

    /// Writes whose failure already surfaced as the command's error
    failed: Mutex<Vec<RecordId>>,
}

impl Cli {
    pub fn new(
        controller: ProjectStateController,
        store: Option<Arc<SqliteGateway>>,
        renderer: TerminalRenderer,
    ) -> Self {
        let notices = controller.notices();
        Self {
            controller,
            store,
            renderer,
            notices,
            failed: Mutex::new(Vec::new()),
        }
    }

    /// Stops push listeners and reports failures raised while the command
    /// ran.
    pub async fn finish(mut self) {
        let failed = std::mem::take(self.failed.get_mut().unwrap_or_else(|e| e.into_inner()));
        while let Ok(notice) = self.notices.try_recv() {
            debug!("notice: {notice}");
            if needs_warning(&notice, &failed) {
                self.renderer.warn(&notice.to_string());
            }
        }
        self.controller.shutdown().await;
    }

    /// Waits for a queued write and tells where the change ended up.
    async fn settle(&self, pending: PendingWrite) -> Result<(RecordId, Persistence)> {
        let id = pending.id().clone();
        let settled = pending.settled().await;
        if settled.is_err() {
            self.failed
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(id.clone());
        }
        settled.with_context(|| format!("{id} was kept locally but could not be stored"))?;
        let persistence = if self.controller.is_offline() {
            Persistence::LocalOnly
        } else {
            Persistence::Stored
        };
        Ok((id, persistence))
    }

    fn store(&self) -> Result<&SqliteGateway> {
        match &self.store {
            Some(store) => Ok(store.as_ref()),
            None => bail!("the client directory needs the store; run without --offline"),
        }
    }

    fn require_staff(&self, what: &str) -> Result<()> {
        if !self.controller.actor().is_staff() {
            bail!("only workshop staff can {what}");
        }
        Ok(())
    }

    async fn resolve_project(&self, target: &ProjectRefArgs) -> Result<ProjectRecord> {
        let project = if target.qr {
            self.controller.project_by_qr(&target.project).await?
        } else {
            self.controller
                .project(&RecordId::new(target.project.as_str()))?
        };
        Ok(project)
    }

    // ------------------------------------------------------------------------
    // Projects
    // ------------------------------------------------------------------------

    pub async fn handle_project_command(&self, command: ProjectCommands) -> Result<()> {
        match command {
            ProjectCommands::Create(args) => {
                let pending = self.controller.create_project(args.into()).await?;
                let (id, persistence) = self.settle(pending).await?;
                let project = self.controller.project(&id)?;
                self.renderer
                    .render(&CreateResult::new(project, persistence).to_string())
            }
            ProjectCommands::List(args) => self.list_projects(&args).await,
            ProjectCommands::Show(target) => {
                let project = self.resolve_project(&target).await?;
                self.renderer.render(&project.to_string())?;
                if let Some(conversation) = self.controller.conversation_for_project(&project.id) {
                    let unread = self.controller.unread_count(&conversation.id);
                    if unread > 0 {
                        self.renderer
                            .render(&format!("\n{unread} unread message(s) in the chat\n"))?;
                    }
                }
                Ok(())
            }
            ProjectCommands::Deliver(target) => {
                let before = self.resolve_project(&target).await?;
                let pending = self.controller.mark_delivered(&before.id).await?;
                self.render_project_update(&before, pending).await
            }
        }
    }

    pub async fn list_projects(&self, args: &ListProjectsArgs) -> Result<()> {
        let projects = match (&args.client, &args.email) {
            (Some(client), _) => self
                .controller
                .projects_for_client(&RecordId::new(client.as_str())),
            (None, Some(email)) => self.controller.projects_for_email(email).await?,
            (None, None) => self.controller.projects(),
        };
        self.renderer
            .render(&ProjectSummaries(projects).to_string())
    }

    async fn render_project_update(&self, before: &ProjectRecord, pending: PendingWrite) -> Result<()> {
        let (_, persistence) = self.settle(pending).await?;
        let after = self.controller.project(&before.id)?;
        let changes = project_changes(before, &after);
        self.renderer
            .render(&UpdateResult::with_changes(after, changes, persistence).to_string())
    }

    // ------------------------------------------------------------------------
    // Steps
    // ------------------------------------------------------------------------

    pub async fn handle_step_command(&self, command: StepCommands) -> Result<()> {
        match command {
            StepCommands::Start(target) => {
                let (project_id, step_id) = target.ids();
                let before = self.controller.project(&project_id)?;
                let pending = self.controller.start_step(&project_id, &step_id).await?;
                self.render_project_update(&before, pending).await
            }
            StepCommands::Complete(CompleteStepArgs { target, forecast }) => {
                let (project_id, step_id) = target.ids();
                let before = self.controller.project(&project_id)?;
                let pending = self
                    .controller
                    .complete_step(&project_id, &step_id, forecast)
                    .await?;
                self.render_project_update(&before, pending).await
            }
            StepCommands::Reopen(target) => {
                let (project_id, step_id) = target.ids();
                let before = self.controller.project(&project_id)?;
                let pending = self.controller.reopen_step(&project_id, &step_id).await?;
                self.render_project_update(&before, pending).await
            }
            StepCommands::Edit(args) => {
                let fields = StepFields::from(&args);
                if fields.is_empty() {
                    bail!("nothing to edit; pass --description, --notes or --technician");
                }
                let EditStepArgs { target, .. } = args;
                let (project_id, step_id) = target.ids();
                let before = self.controller.project(&project_id)?;
                let pending = self
                    .controller
                    .edit_step(&project_id, &step_id, &fields)
                    .await?;
                self.render_project_update(&before, pending).await
            }
            StepCommands::Photo(StepPhotoArgs { target, file }) => self.upload_photo(&target, &file).await,
        }
    }

    async fn upload_photo(&self, target: &StepRefArgs, file: &Path) -> Result<()> {
        let file_name = file
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("{} is not a file name", file.display()))?;
        let bytes = tokio::fs::read(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;

        let (project_id, step_id) = target.ids();
        let before = self.controller.project(&project_id)?;
        let pending = self
            .controller
            .upload_step_photo(&project_id, &step_id, bytes, file_name)
            .await?;
        self.render_project_update(&before, pending).await
    }

    // ------------------------------------------------------------------------
    // Chat
    // ------------------------------------------------------------------------

    pub async fn handle_chat_command(&self, command: ChatCommands) -> Result<()> {
        match command {
            ChatCommands::Open(target) => {
                let project_id = RecordId::new(target.project);
                let existed = self.controller.conversation_for_project(&project_id).is_some();
                let (conversation, pending) = self.controller.open_conversation(&project_id).await?;
                let (_, persistence) = self.settle(pending).await?;
                let conversation = self.controller.conversation(&conversation.id)?;
                if existed {
                    self.renderer.render(&conversation.to_string())
                } else {
                    self.renderer
                        .render(&CreateResult::new(conversation, persistence).to_string())
                }
            }
            ChatCommands::Send(args) => {
                let project_id = RecordId::new(args.project);
                let (conversation, opened) = self.controller.open_conversation(&project_id).await?;
                let sent = self
                    .controller
                    .send_message(&conversation.id, &args.content)
                    .await?;
                self.settle(opened).await?;
                let (id, persistence) = self.settle(sent).await?;
                let message = self
                    .controller
                    .state()
                    .message(&id)
                    .cloned()
                    .with_context(|| format!("message {id} vanished from the session"))?;
                self.renderer
                    .render(&CreateResult::new(message, persistence).to_string())
            }
            ChatCommands::Show(target) => {
                let project_id = RecordId::new(target.project);
                let Some(conversation) = self.controller.conversation_for_project(&project_id) else {
                    return self
                        .renderer
                        .render("No conversation for this project yet.\n");
                };
                let messages = Messages(self.controller.messages(&conversation.id));
                let unread = messages.unread_for(&self.controller.actor().id);
                self.renderer.render(&conversation.to_string())?;
                self.renderer.render(&messages.to_string())?;
                if unread > 0 {
                    self.renderer.render(&format!("\n{unread} unread\n"))?;
                }
                Ok(())
            }
            ChatCommands::Read(target) => {
                let project_id = RecordId::new(target.project);
                let conversation = self
                    .controller
                    .conversation_for_project(&project_id)
                    .with_context(|| format!("project {project_id} has no conversation"))?;
                let unread = self.controller.unread_count(&conversation.id);
                let pending = self.controller.mark_conversation_read(&conversation.id).await?;
                let (_, persistence) = self.settle(pending).await?;
                self.renderer.render(&format!(
                    "Marked {unread} message(s) as read ({persistence})\n"
                ))
            }
        }
    }

    // ------------------------------------------------------------------------
    // Quotes
    // ------------------------------------------------------------------------

    pub async fn handle_quote_command(&self, command: QuoteCommands) -> Result<()> {
        match command {
            QuoteCommands::Request(args) => self.request_quote(args).await,
            QuoteCommands::List(args) => self.list_quotes(&args),
            QuoteCommands::Analyze(target) => {
                let id = RecordId::new(target.quote);
                let before = self.controller.quote(&id)?;
                let pending = self.controller.analyze_quote(&id).await?;
                self.render_quote_update(&before, pending).await
            }
            QuoteCommands::Hold(target) => {
                let id = RecordId::new(target.quote);
                let before = self.controller.quote(&id)?;
                let pending = self.controller.hold_quote(&id).await?;
                self.render_quote_update(&before, pending).await
            }
            QuoteCommands::Send(SendQuoteArgs {
                quote,
                price,
                days,
                notes,
            }) => {
                let id = RecordId::new(quote);
                let before = self.controller.quote(&id)?;
                let pending = self
                    .controller
                    .send_quote_to_client(&id, price, days, notes)
                    .await?;
                self.render_quote_update(&before, pending).await
            }
            QuoteCommands::Approve(AnswerQuoteArgs { quote, response }) => {
                let id = RecordId::new(quote);
                let before = self.controller.quote(&id)?;
                let pending = self.controller.approve_quote(&id, response).await?;
                self.render_quote_update(&before, pending).await
            }
            QuoteCommands::Reject(AnswerQuoteArgs { quote, response }) => {
                let id = RecordId::new(quote);
                let before = self.controller.quote(&id)?;
                let pending = self.controller.reject_quote(&id, response).await?;
                self.render_quote_update(&before, pending).await
            }
            QuoteCommands::Expire(target) => {
                let id = RecordId::new(target.quote);
                let before = self.controller.quote(&id)?;
                let pending = self.controller.expire_quote(&id).await?;
                self.render_quote_update(&before, pending).await
            }
        }
    }

    async fn request_quote(&self, args: RequestQuoteArgs) -> Result<()> {
        let actor = self.controller.actor();
        let pending = if actor.role == Role::Client {
            if args.client.as_deref().is_some_and(|c| c != actor.id.as_str()) {
                bail!("clients can only request quotes for themselves");
            }
            self.controller
                .request_quote(args.into_params(&actor.id))
                .await?
        } else {
            if args.client.is_none() {
                bail!("--client is required when staff record a quote");
            }
            self.controller
                .create_quote(args.into_params(&actor.id), QuoteStatus::Pending)
                .await?
        };
        let (id, persistence) = self.settle(pending).await?;
        let quote = self.controller.quote(&id)?;
        self.renderer
            .render(&CreateResult::new(quote, persistence).to_string())
    }

    fn list_quotes(&self, args: &ListQuotesArgs) -> Result<()> {
        let actor = self.controller.actor();
        let mut quotes = if args.pending {
            self.controller.pending_quotes()
        } else if let Some(status) = args.status {
            self.controller.quotes_with_status(status.into())
        } else {
            self.controller.quotes()
        };
        if actor.role == Role::Client {
            quotes.retain(|q| q.client_id == actor.id);
        }
        self.renderer.render(&Quotes(quotes).to_string())
    }

    async fn render_quote_update(&self, before: &QuoteRecord, pending: PendingWrite) -> Result<()> {
        let (_, persistence) = self.settle(pending).await?;
        let after = self.controller.quote(&before.id)?;
        let mut changes = Vec::new();
        if before.status != after.status {
            changes.push(format!("Status: {} → {}", before.status, after.status));
        }
        if before.estimated_price != after.estimated_price {
            if let Some(price) = after.estimated_price {
                changes.push(format!("Price: {price:.2}"));
            }
        }
        if before.client_response != after.client_response {
            if let Some(response) = &after.client_response {
                changes.push(format!("Client response: {response}"));
            }
        }
        self.renderer
            .render(&UpdateResult::with_changes(after, changes, persistence).to_string())
    }

    // ------------------------------------------------------------------------
    // Directory
    // ------------------------------------------------------------------------

    pub async fn handle_client_command(&self, command: ClientCommands) -> Result<()> {
        self.require_staff("manage the client directory")?;
        match command {
            ClientCommands::Add(AddClientArgs { name, email, phone }) => {
                let client = self
                    .store()?
                    .add_client(&name, &email, phone.as_deref())
                    .await
                    .context("Failed to register client")?;
                self.renderer
                    .render(&format!("Registered client with ID: {}\n\n{client}", client.id))
            }
            ClientCommands::List => {
                let clients = self.store()?.list_clients().await?;
                if clients.is_empty() {
                    return self.renderer.render("No clients registered.\n");
                }
                for client in clients {
                    self.renderer.render(&client.to_string())?;
                }
                Ok(())
            }
        }
    }

    pub async fn handle_vehicle_command(&self, command: VehicleCommands) -> Result<()> {
        self.require_staff("register vehicles")?;
        match command {
            VehicleCommands::Add(AddVehicleArgs {
                client,
                brand,
                model,
                year,
                plate,
                protection,
            }) => {
                let draft = Vehicle {
                    id: RecordId::new(""),
                    client_id: RecordId::new(client),
                    brand,
                    model,
                    year,
                    plate,
                    protection_level: protection,
                };
                let vehicle = self
                    .store()?
                    .add_vehicle(&draft)
                    .await
                    .context("Failed to register vehicle")?;
                self.renderer.render(&format!(
                    "Registered vehicle with ID: {}\n\n{vehicle}",
                    vehicle.id
                ))
            }
        }
    }
}

/// Human-readable list of what changed between two versions of a project.
fn project_changes(before: &ProjectRecord, after: &ProjectRecord) -> Vec<String> {
    let mut changes = Vec::new();
    for (old, new) in before.timeline.iter().zip(&after.timeline) {
        if old.status != new.status {
            changes.push(format!("{}: {} → {}", new.title, old.status, new.status));
        }
        if old.estimated_date != new.estimated_date {
            if let Some(date) = new.estimated_date {
                changes.push(format!("{} forecast for {date}", new.title));
            }
        }
        if new.photos.len() > old.photos.len() {
            changes.push(format!("Photo added to {}", new.title));
        }
        for (field, old, new_value) in [
            ("description", &old.description, &new.description),
            ("notes", &old.notes, &new.notes),
            ("technician", &old.technician, &new.technician),
        ] {
            if old != new_value {
                changes.push(format!("Updated {field} of {}", new.title));
            }
        }
    }
    if before.status != after.status {
        changes.push(format!("Project: {} → {}", before.status, after.status));
    }
    if before.progress != after.progress {
        changes.push(format!("Progress: {}% → {}%", before.progress, after.progress));
    }
    changes
}

#[cfg(test)]
mod tests {
    use elitetrack_core::{
        models::{Actor, IdKind},
        NewProject, NoticeKind,
    };
    use tempfile::TempDir;

    use super::*;
    use crate::args::CreateProjectArgs;

    async fn staff_session(store: &Arc<SqliteGateway>) -> ProjectStateController {
        ProjectStateController::builder()
            .with_actor(Actor::new("staff", "Workshop", Role::Executor))
            .with_gateway(store.clone())
            .build()
            .await
            .expect("Failed to build controller")
    }

    #[tokio::test]
    async fn test_store_rejection_is_not_warned_twice() {
        let dir = TempDir::new().expect("Failed to create temporary directory");
        let store = Arc::new(
            SqliteGateway::open(dir.path().join("store.db"))
                .await
                .expect("Failed to open store"),
        );
        let first = staff_session(&store).await;
        first
            .create_project(NewProject {
                client_id: RecordId::new("cli_1"),
                vehicle_id: RecordId::new("veh_1"),
                qr_code: "QR-1".to_string(),
                steps: vec!["Glass".to_string()],
                ..Default::default()
            })
            .await
            .expect("Failed to create project")
            .settled()
            .await
            .expect("Project was not stored");

        // This session has not fetched QR-1, so only the store rejects it
        let session = staff_session(&store).await;
        let mut cli = Cli::new(session, Some(store), TerminalRenderer::new(false));
        let err = cli
            .handle_project_command(ProjectCommands::Create(CreateProjectArgs {
                qr_code: "QR-1".to_string(),
                client: "cli_1".to_string(),
                vehicle: "veh_1".to_string(),
                steps: vec!["Glass".to_string()],
                start: None,
                delivery: None,
            }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("could not be stored"));

        let failed = cli.failed.lock().unwrap().clone();
        assert_eq!(failed.len(), 1);
        let notice = cli.notices.recv().await.unwrap();
        assert_eq!(notice.kind, NoticeKind::PersistenceFailure);
        assert_eq!(notice.id.as_ref(), Some(&failed[0]));
        assert!(!needs_warning(&notice, &failed));
    }

    #[test]
    fn test_failed_write_is_reported_once() {
        let failed = vec![RecordId::new("local-prj-1")];
        let same = Notice::new(
            NoticeKind::PersistenceFailure,
            IdKind::Project,
            RecordId::new("local-prj-1"),
            "duplicate qr_code",
        );
        let other = Notice::new(
            NoticeKind::PersistenceFailure,
            IdKind::Message,
            RecordId::new("local-msg-2"),
            "store unavailable",
        );
        let fallback = Notice::fallback(IdKind::Project, "store unavailable");
        let stored = Notice::new(
            NoticeKind::Reconciled,
            IdKind::Message,
            RecordId::new("local-msg-3"),
            "now msg_1",
        );

        assert!(!needs_warning(&same, &failed));
        assert!(needs_warning(&other, &failed));
        assert!(needs_warning(&fallback, &failed));
        assert!(!needs_warning(&stored, &failed));
    }
}
