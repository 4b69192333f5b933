//! Wholesale refresh from the gateway with cache fallback.

use log::{debug, info, warn};

use super::{
    notice::Notice,
    state::{Action, Batch, Changed},
    ProjectStateController,
};
use crate::{
    error::{Result, TrackerError},
    gateway::{dto::checked_all, PersistenceGateway},
    models::{
        ConversationFilter, ConversationRecord, IdKind, MessageFilter, MessageRecord,
        ProjectFilter, ProjectRecord, QuoteFilter, QuoteRecord,
    },
};

impl ProjectStateController {
    /// Fetches every collection the actor may see and replaces the local
    /// copies, keeping provisional records that are still in flight.
    ///
    /// Clients only receive their own projects, the conversations of those
    /// projects and their own quotes. Without a gateway this does nothing.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::PersistenceFailure` when any fetch fails. Local
    /// state (the cached snapshot) is left as it was and a fallback notice is
    /// sent.
    pub async fn refresh(&self) -> Result<()> {
        let Some(gateway) = self.inner.gateway.clone() else {
            debug!("no gateway configured; keeping cached state");
            return Ok(());
        };

        let fetched = async {
            let projects = self.fetch_projects(gateway.as_ref()).await?;
            let conversations = self
                .fetch_conversations(gateway.as_ref(), &projects)
                .await?;
            let messages = self
                .fetch_messages(gateway.as_ref(), &conversations)
                .await?;
            let quotes = self.fetch_quotes(gateway.as_ref()).await?;
            Ok::<_, TrackerError>(vec![
                Batch::Projects(projects),
                Batch::Conversations(conversations),
                Batch::Messages(messages),
                Batch::Quotes(quotes),
            ])
        }
        .await;

        match fetched {
            Ok(batches) => {
                self.apply_fetched(batches).await;
                info!("refreshed session state from the store");
                Ok(())
            }
            Err(e) => Err(self.fall_back(IdKind::Project, e)),
        }
    }

    /// Refreshes the project collection only.
    ///
    /// # Errors
    ///
    /// Same as [`refresh`](Self::refresh).
    pub async fn refresh_projects(&self) -> Result<()> {
        let Some(gateway) = self.inner.gateway.clone() else {
            return Ok(());
        };
        match self.fetch_projects(gateway.as_ref()).await {
            Ok(projects) => {
                self.apply_fetched(vec![Batch::Projects(projects)]).await;
                Ok(())
            }
            Err(e) => Err(self.fall_back(IdKind::Project, e)),
        }
    }

    /// Refreshes the quote collection only.
    ///
    /// # Errors
    ///
    /// Same as [`refresh`](Self::refresh).
    pub async fn refresh_quotes(&self) -> Result<()> {
        let Some(gateway) = self.inner.gateway.clone() else {
            return Ok(());
        };
        match self.fetch_quotes(gateway.as_ref()).await {
            Ok(quotes) => {
                self.apply_fetched(vec![Batch::Quotes(quotes)]).await;
                Ok(())
            }
            Err(e) => Err(self.fall_back(IdKind::Quote, e)),
        }
    }

    async fn apply_fetched(&self, batches: Vec<Batch>) {
        let mut changed = Changed::default();
        for batch in batches {
            let (next, _) = self.inner.shared.dispatch(Action::Fetched(batch));
            changed.merge(next);
        }
        self.inner.shared.persist(changed).await;
    }

    fn fall_back(&self, entity: IdKind, error: TrackerError) -> TrackerError {
        let error = error.into_persistence("refresh");
        warn!("refresh failed, staying on cached state: {error}");
        self.inner
            .shared
            .notify(Notice::fallback(entity, error.to_string()));
        error
    }

    async fn fetch_projects(&self, gateway: &dyn PersistenceGateway) -> Result<Vec<ProjectRecord>> {
        let actor = self.actor();
        let filter = if actor.is_staff() {
            ProjectFilter::default()
        } else {
            ProjectFilter::for_client(actor.id.clone())
        };
        checked_all("query projects", gateway.query_projects(&filter).await?)
    }

    async fn fetch_conversations(
        &self,
        gateway: &dyn PersistenceGateway,
        projects: &[ProjectRecord],
    ) -> Result<Vec<ConversationRecord>> {
        if self.actor().is_staff() {
            let all = gateway
                .query_conversations(&ConversationFilter::default())
                .await?;
            return checked_all("query conversations", all);
        }

        let mut conversations = Vec::new();
        for project in projects {
            let filter = ConversationFilter {
                project_id: Some(project.id.clone()),
            };
            conversations.extend(gateway.query_conversations(&filter).await?);
        }
        checked_all("query conversations", conversations)
    }

    async fn fetch_messages(
        &self,
        gateway: &dyn PersistenceGateway,
        conversations: &[ConversationRecord],
    ) -> Result<Vec<MessageRecord>> {
        if self.actor().is_staff() {
            let all = gateway.query_messages(&MessageFilter::default()).await?;
            return checked_all("query messages", all);
        }

        let mut messages = Vec::new();
        for conversation in conversations {
            let filter = MessageFilter {
                conversation_id: Some(conversation.id.clone()),
            };
            messages.extend(gateway.query_messages(&filter).await?);
        }
        checked_all("query messages", messages)
    }

    async fn fetch_quotes(&self, gateway: &dyn PersistenceGateway) -> Result<Vec<QuoteRecord>> {
        let actor = self.actor();
        let filter = QuoteFilter {
            client_id: (!actor.is_staff()).then(|| actor.id.clone()),
            ..Default::default()
        };
        checked_all("query quotes", gateway.query_quotes(&filter).await?)
    }
}
