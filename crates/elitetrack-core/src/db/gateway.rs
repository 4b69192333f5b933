//! Persistence gateway and directory lookup over a SQLite file.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use log::debug;
use serde::Serialize;

use super::{run_blocking, Database};
use crate::{
    error::{Result, TrackerError},
    gateway::{DirectoryLookup, PersistenceGateway},
    models::{
        ClientProfile, ConversationFilter, ConversationRecord, IdKind, MessageFilter,
        MessagePatch, MessageRecord, ProjectFilter, ProjectPatch, ProjectRecord, QuoteFilter,
        QuotePatch, QuoteRecord, RecordId, StepPatch, Vehicle,
    },
    push::{ChangeKind, InProcessBridge, PushEvent, ScopeId},
};

/// SQLite-backed store.
///
/// Each call opens its own connection on the blocking pool. When a bridge is
/// attached, every successful write is echoed to it as a push event.
#[derive(Clone)]
pub struct SqliteGateway {
    db_path: PathBuf,
    bridge: Option<Arc<InProcessBridge>>,
}

impl SqliteGateway {
    /// Opens (creating if needed) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::FileSystem` if the parent directory cannot be
    /// created and `TrackerError::Database` if schema initialization fails.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TrackerError::FileSystem {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let path = db_path.clone();
        run_blocking(move || Database::new(&path).map(|_| ())).await?;

        Ok(Self {
            db_path,
            bridge: None,
        })
    }

    /// Default location: `$XDG_DATA_HOME/elitetrack/elitetrack.db`.
    pub fn default_path() -> Result<PathBuf> {
        xdg::BaseDirectories::with_prefix("elitetrack")
            .place_data_file("elitetrack.db")
            .map_err(|e| TrackerError::XdgDirectory(e.to_string()))
    }

    /// Echo every write to `bridge`.
    pub fn with_bridge(mut self, bridge: Arc<InProcessBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    async fn call<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Database) -> Result<T> + Send + 'static,
    {
        let path = self.db_path.clone();
        run_blocking(move || {
            let mut db = Database::new(&path)?;
            f(&mut db)
        })
        .await
    }

    fn publish<R: Serialize>(
        &self,
        kind: IdKind,
        id: &RecordId,
        change: ChangeKind,
        scope: ScopeId,
        record: &R,
    ) -> Result<()> {
        if let Some(bridge) = &self.bridge {
            bridge.publish(PushEvent::new(kind, id.clone(), change, scope, record)?);
        }
        Ok(())
    }

    fn publish_project(&self, project: &ProjectRecord, change: ChangeKind) -> Result<()> {
        self.publish(
            IdKind::Project,
            &project.id,
            change,
            ScopeId::Project(project.id.clone()),
            project,
        )
    }

    /// Registers a client in the directory.
    pub async fn add_client(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
    ) -> Result<ClientProfile> {
        let (name, email, phone) = (name.to_string(), email.to_string(), phone.map(String::from));
        self.call(move |db| db.insert_client(&name, &email, phone.as_deref()))
            .await
    }

    /// Registers a vehicle for an existing client.
    pub async fn add_vehicle(&self, vehicle: &Vehicle) -> Result<Vehicle> {
        let vehicle = vehicle.clone();
        self.call(move |db| db.insert_vehicle(&vehicle)).await
    }

    pub async fn list_clients(&self) -> Result<Vec<ClientProfile>> {
        self.call(|db| db.list_clients()).await
    }
}

#[async_trait]
impl PersistenceGateway for SqliteGateway {
    async fn create_project(&self, draft: &ProjectRecord) -> Result<ProjectRecord> {
        let draft = draft.clone();
        let project = self.call(move |db| db.insert_project(&draft)).await?;
        debug!("stored project {} ({})", project.id, project.qr_code);
        self.publish_project(&project, ChangeKind::Insert)?;
        Ok(project)
    }

    async fn update_project(&self, id: &RecordId, patch: &ProjectPatch) -> Result<()> {
        let (id, patch) = (id.clone(), patch.clone());
        let project = self.call(move |db| db.update_project(&id, &patch)).await?;
        self.publish_project(&project, ChangeKind::Update)
    }

    async fn update_step(&self, id: &RecordId, patch: &StepPatch) -> Result<()> {
        let (id, patch) = (id.clone(), patch.clone());
        let project = self.call(move |db| db.update_step(&id, &patch)).await?;
        self.publish_project(&project, ChangeKind::Update)
    }

    async fn query_projects(&self, filter: &ProjectFilter) -> Result<Vec<ProjectRecord>> {
        let filter = filter.clone();
        self.call(move |db| db.list_projects(&filter)).await
    }

    async fn create_conversation(&self, draft: &ConversationRecord) -> Result<ConversationRecord> {
        let draft = draft.clone();
        let conversation = self.call(move |db| db.insert_conversation(&draft)).await?;
        self.publish(
            IdKind::Conversation,
            &conversation.id,
            ChangeKind::Insert,
            ScopeId::Project(conversation.project_id.clone()),
            &conversation,
        )?;
        Ok(conversation)
    }

    async fn query_conversations(
        &self,
        filter: &ConversationFilter,
    ) -> Result<Vec<ConversationRecord>> {
        let filter = filter.clone();
        self.call(move |db| db.list_conversations(&filter)).await
    }

    async fn create_message(&self, draft: &MessageRecord) -> Result<MessageRecord> {
        let draft = draft.clone();
        let message = self.call(move |db| db.insert_message(&draft)).await?;
        self.publish(
            IdKind::Message,
            &message.id,
            ChangeKind::Insert,
            ScopeId::Conversation(message.conversation_id.clone()),
            &message,
        )?;
        Ok(message)
    }

    async fn update_message(&self, id: &RecordId, patch: &MessagePatch) -> Result<()> {
        let (id, patch) = (id.clone(), patch.clone());
        let message = self.call(move |db| db.update_message(&id, &patch)).await?;
        self.publish(
            IdKind::Message,
            &message.id,
            ChangeKind::Update,
            ScopeId::Conversation(message.conversation_id.clone()),
            &message,
        )
    }

    async fn query_messages(&self, filter: &MessageFilter) -> Result<Vec<MessageRecord>> {
        let filter = filter.clone();
        self.call(move |db| db.list_messages(&filter)).await
    }

    async fn create_quote(&self, draft: &QuoteRecord) -> Result<QuoteRecord> {
        let draft = draft.clone();
        let quote = self.call(move |db| db.insert_quote(&draft)).await?;
        self.publish(
            IdKind::Quote,
            &quote.id,
            ChangeKind::Insert,
            ScopeId::Quotes,
            &quote,
        )?;
        Ok(quote)
    }

    async fn update_quote(&self, id: &RecordId, patch: &QuotePatch) -> Result<()> {
        let (id, patch) = (id.clone(), patch.clone());
        let quote = self.call(move |db| db.update_quote(&id, &patch)).await?;
        self.publish(
            IdKind::Quote,
            &quote.id,
            ChangeKind::Update,
            ScopeId::Quotes,
            &quote,
        )
    }

    async fn query_quotes(&self, filter: &QuoteFilter) -> Result<Vec<QuoteRecord>> {
        let filter = filter.clone();
        self.call(move |db| db.list_quotes(&filter)).await
    }
}

#[async_trait]
impl DirectoryLookup for SqliteGateway {
    async fn client(&self, id: &RecordId) -> Result<Option<ClientProfile>> {
        let id = id.clone();
        self.call(move |db| db.get_client(&id)).await
    }

    async fn client_by_email(&self, email: &str) -> Result<Option<ClientProfile>> {
        let email = email.to_string();
        self.call(move |db| db.get_client_by_email(&email)).await
    }

    async fn vehicle(&self, id: &RecordId) -> Result<Option<Vehicle>> {
        let id = id.clone();
        self.call(move |db| db.get_vehicle(&id)).await
    }
}
