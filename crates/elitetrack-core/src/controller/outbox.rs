//! Ordered write lane.
//!
//! Every gateway write of a session goes through a single worker in issue
//! order. Create jobs read the record from the state when they run, so a
//! message sent to a conversation that was still being created is stored
//! with the conversation's canonical id. The draft a create sends is kept in
//! the state until the store answers, so local edits made meanwhile can be
//! carried onto the canonical record.

use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::{mpsc, oneshot};

use super::{
    notice::{Notice, NoticeKind},
    shared::Shared,
    state::{Action, Entity},
};
use crate::{
    error::{Result, TrackerError},
    gateway::{dto::checked, PersistenceGateway},
    models::{IdKind, MessagePatch, ProjectPatch, QuotePatch, RecordId, StepPatch},
};

#[derive(Debug, Clone)]
pub(crate) enum WriteJob {
    CreateProject {
        id: RecordId,
    },
    UpdateProject {
        id: RecordId,
        steps: Vec<(RecordId, StepPatch)>,
        project: ProjectPatch,
    },
    CreateConversation {
        id: RecordId,
    },
    CreateMessage {
        id: RecordId,
    },
    UpdateMessages {
        conversation_id: RecordId,
        patches: Vec<(RecordId, MessagePatch)>,
    },
    CreateQuote {
        id: RecordId,
    },
    UpdateQuote {
        id: RecordId,
        patch: QuotePatch,
    },
}

impl WriteJob {
    fn is_create(&self) -> bool {
        matches!(
            self,
            WriteJob::CreateProject { .. }
                | WriteJob::CreateConversation { .. }
                | WriteJob::CreateMessage { .. }
                | WriteJob::CreateQuote { .. }
        )
    }

    fn target(&self) -> (IdKind, &RecordId, &'static str) {
        match self {
            WriteJob::CreateProject { id } => (IdKind::Project, id, "create project"),
            WriteJob::UpdateProject { id, .. } => (IdKind::Project, id, "update project"),
            WriteJob::CreateConversation { id } => {
                (IdKind::Conversation, id, "create conversation")
            }
            WriteJob::CreateMessage { id } => (IdKind::Message, id, "create message"),
            WriteJob::UpdateMessages {
                conversation_id, ..
            } => (IdKind::Conversation, conversation_id, "update messages"),
            WriteJob::CreateQuote { id } => (IdKind::Quote, id, "create quote"),
            WriteJob::UpdateQuote { id, .. } => (IdKind::Quote, id, "update quote"),
        }
    }
}

struct Envelope {
    job: WriteJob,
    done: oneshot::Sender<Result<()>>,
}

/// Completion token for one queued write.
///
/// Local state already reflects the write; the token only tells when (and
/// whether) the store accepted it.
#[derive(Debug)]
#[must_use]
pub struct PendingWrite {
    id: RecordId,
    done: Option<oneshot::Receiver<Result<()>>>,
}

impl PendingWrite {
    /// A write with nothing to send: cache-only sessions and no-op edits.
    pub(crate) fn settled_now(id: RecordId) -> Self {
        Self { id, done: None }
    }

    /// Id of the record the write targets, provisional for creates.
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn is_queued(&self) -> bool {
        self.done.is_some()
    }

    /// Waits for the store's answer.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::PersistenceFailure` when the gateway call
    /// failed. The failure has already been reported as a notice.
    pub async fn settled(self) -> Result<()> {
        match self.done {
            None => Ok(()),
            Some(done) => done
                .await
                .unwrap_or_else(|_| Err(TrackerError::persistence("write", "outbox stopped"))),
        }
    }
}

#[derive(Clone)]
pub(crate) struct Outbox {
    tx: Option<mpsc::UnboundedSender<Envelope>>,
}

impl Outbox {
    /// Outbox for a session without a gateway; every write settles at once.
    pub(crate) fn disabled() -> Self {
        Self { tx: None }
    }

    pub(crate) fn spawn(shared: Arc<Shared>, gateway: Arc<dyn PersistenceGateway>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(shared, gateway, rx));
        Self { tx: Some(tx) }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    pub(crate) fn enqueue(&self, job: WriteJob) -> PendingWrite {
        let id = job.target().1.clone();
        let Some(tx) = &self.tx else {
            return PendingWrite::settled_now(id);
        };
        let (done, rx) = oneshot::channel();
        if tx.send(Envelope { job, done }).is_err() {
            warn!("outbox stopped; write for {id} dropped");
        }
        PendingWrite { id, done: Some(rx) }
    }
}

async fn run(
    shared: Arc<Shared>,
    gateway: Arc<dyn PersistenceGateway>,
    mut rx: mpsc::UnboundedReceiver<Envelope>,
) {
    while let Some(Envelope { job, done }) = rx.recv().await {
        let (kind, id, operation) = {
            let (kind, id, operation) = job.target();
            (kind, id.clone(), operation)
        };
        debug!("outbox: {operation} {id}");

        let create = job.is_create();
        let result = execute(&shared, gateway.as_ref(), job)
            .await
            .map_err(|e| e.into_persistence(operation));
        if let Err(e) = &result {
            warn!("{operation} {id} failed: {e}");
            if create {
                shared.dispatch(Action::Unsent(id.clone()));
            }
            shared.notify(Notice::new(
                NoticeKind::PersistenceFailure,
                kind,
                id,
                e.to_string(),
            ));
        }
        // The caller may have dropped its token.
        let _ = done.send(result);
    }
    debug!("outbox drained");
}

/// A create whose record is gone is fine if the record was already matched
/// to its canonical copy (by a fetch or a push).
fn missing_draft(shared: &Shared, kind: IdKind, id: &RecordId) -> Result<()> {
    if shared.read(|s| s.aliases.canonical_of(id).is_some()) {
        debug!("{} {id} was reconciled before its create ran", kind.name());
        return Ok(());
    }
    Err(TrackerError::not_found(kind.name(), id))
}

async fn execute(shared: &Shared, gateway: &dyn PersistenceGateway, job: WriteJob) -> Result<()> {
    match job {
        WriteJob::CreateProject { id } => {
            let Some(draft) = shared.read(|s| s.projects.get(&id).cloned()) else {
                return missing_draft(shared, IdKind::Project, &id);
            };
            shared.dispatch(Action::Sending(Entity::Project(draft.clone())));
            let stored = checked("create project", gateway.create_project(&draft).await?)?;
            shared
                .reconciled(id, Entity::Project(stored), IdKind::Project)
                .await;
        }
        WriteJob::UpdateProject { id, steps, project } => {
            let id = shared.canonical(IdKind::Project, &id)?;
            for (step_id, patch) in &steps {
                let step_id = shared.canonical(IdKind::Step, step_id)?;
                gateway.update_step(&step_id, patch).await?;
            }
            if !project.is_empty() {
                gateway.update_project(&id, &project).await?;
            }
        }
        WriteJob::CreateConversation { id } => {
            let Some(mut draft) = shared.read(|s| s.conversations.get(&id).cloned()) else {
                return missing_draft(shared, IdKind::Conversation, &id);
            };
            shared.dispatch(Action::Sending(Entity::Conversation(draft.clone())));
            draft.project_id = shared.canonical(IdKind::Project, &draft.project_id)?;
            let stored = checked(
                "create conversation",
                gateway.create_conversation(&draft).await?,
            )?;
            shared
                .reconciled(id, Entity::Conversation(stored), IdKind::Conversation)
                .await;
        }
        WriteJob::CreateMessage { id } => {
            let Some(mut draft) = shared.read(|s| s.messages.get(&id).cloned()) else {
                return missing_draft(shared, IdKind::Message, &id);
            };
            shared.dispatch(Action::Sending(Entity::Message(draft.clone())));
            draft.conversation_id =
                shared.canonical(IdKind::Conversation, &draft.conversation_id)?;
            let stored = checked("create message", gateway.create_message(&draft).await?)?;
            shared
                .reconciled(id, Entity::Message(stored), IdKind::Message)
                .await;
        }
        WriteJob::UpdateMessages { patches, .. } => {
            for (message_id, patch) in &patches {
                let message_id = shared.canonical(IdKind::Message, message_id)?;
                gateway.update_message(&message_id, patch).await?;
            }
        }
        WriteJob::CreateQuote { id } => {
            let Some(mut draft) = shared.read(|s| s.quotes.get(&id).cloned()) else {
                return missing_draft(shared, IdKind::Quote, &id);
            };
            shared.dispatch(Action::Sending(Entity::Quote(draft.clone())));
            if let Some(project_id) = &draft.project_id {
                draft.project_id = Some(shared.canonical(IdKind::Project, project_id)?);
            }
            let stored = checked("create quote", gateway.create_quote(&draft).await?)?;
            shared
                .reconciled(id, Entity::Quote(stored), IdKind::Quote)
                .await;
        }
        WriteJob::UpdateQuote { id, patch } => {
            let id = shared.canonical(IdKind::Quote, &id)?;
            gateway.update_quote(&id, &patch).await?;
        }
    }
    Ok(())
}
