//! State hub shared by the controller, the outbox worker and push listeners.

use jiff::SignedDuration;
use log::{debug, warn};
use tokio::sync::{broadcast, watch, Mutex};

use super::{
    notice::{Notice, NoticeKind},
    state::{reduce, Action, Changed, Entity, Outcome, SessionState},
};
use crate::{
    cache::{LocalStateStore, CONVERSATIONS_KEY, MESSAGES_KEY, PROJECTS_KEY, QUOTES_KEY},
    error::{Result, TrackerError},
    gateway::dto::decode,
    models::{IdKind, RecordId},
    push::PushEvent,
    reconcile::{MergeOutcome, ReconcileOutcome},
};

const NOTICE_CAPACITY: usize = 64;

pub(crate) struct Shared {
    pub(crate) state: watch::Sender<SessionState>,
    pub(crate) notices: broadcast::Sender<Notice>,
    store: LocalStateStore,
    cache_lock: Mutex<()>,
    window: SignedDuration,
}

impl Shared {
    pub(crate) fn new(store: LocalStateStore, window: SignedDuration) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            state,
            notices,
            store,
            cache_lock: Mutex::new(()),
            window,
        }
    }

    pub(crate) fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub(crate) fn read<T>(&self, f: impl FnOnce(&SessionState) -> T) -> T {
        f(&self.state.borrow())
    }

    /// Applies one action and wakes observers if anything changed.
    pub(crate) fn dispatch(&self, action: Action) -> (Changed, Outcome) {
        let mut result = (Changed::default(), Outcome::None);
        self.state.send_if_modified(|state| {
            result = reduce(state, action, self.window);
            result.0.any()
        });
        result
    }

    /// Runs a guarded mutation: `plan` inspects the current state and either
    /// rejects or yields the action to apply. Check and change run under the
    /// state lock.
    pub(crate) fn update<T>(
        &self,
        plan: impl FnOnce(&SessionState) -> Result<(Option<Action>, T)>,
    ) -> Result<(T, Changed)> {
        let mut result = None;
        self.state.send_if_modified(|state| match plan(state) {
            Ok((Some(action), value)) => {
                let (changed, _) = reduce(state, action, self.window);
                result = Some(Ok((value, changed)));
                changed.any()
            }
            Ok((None, value)) => {
                result = Some(Ok((value, Changed::default())));
                false
            }
            Err(e) => {
                result = Some(Err(e));
                false
            }
        });
        result.unwrap_or_else(|| {
            Err(TrackerError::Configuration {
                message: "state update did not run".to_string(),
            })
        })
    }

    /// Canonical form of `id`, failing when it never got one.
    pub(crate) fn canonical(&self, kind: IdKind, id: &RecordId) -> Result<RecordId> {
        if !id.is_provisional() {
            return Ok(id.clone());
        }
        self.read(|s| s.aliases.canonical_of(id).cloned())
            .ok_or_else(|| {
                TrackerError::persistence(
                    format!("resolve {}", kind.name()),
                    format!("{} {id} has not been stored", kind.name()),
                )
            })
    }

    pub(crate) fn notify(&self, notice: Notice) {
        debug!("notice: {notice}");
        // No receivers is fine.
        let _ = self.notices.send(notice);
    }

    /// Writes every changed collection to the durable cache.
    ///
    /// Cache failures are logged and otherwise ignored; the in-memory state is
    /// authoritative for the session.
    pub(crate) async fn persist(&self, changed: Changed) {
        if !changed.collections() {
            return;
        }
        let _guard = self.cache_lock.lock().await;
        let snapshot = self.snapshot();
        if let Err(e) = self.write_snapshot(&snapshot, changed).await {
            warn!("failed to write local cache: {e}");
        }
    }

    async fn write_snapshot(&self, state: &SessionState, changed: Changed) -> Result<()> {
        if changed.projects {
            self.store.store(PROJECTS_KEY, &state.projects).await?;
        }
        if changed.conversations {
            self.store
                .store(CONVERSATIONS_KEY, &state.conversations)
                .await?;
        }
        if changed.messages {
            self.store.store(MESSAGES_KEY, &state.messages).await?;
        }
        if changed.quotes {
            self.store.store(QUOTES_KEY, &state.quotes).await?;
        }
        Ok(())
    }

    pub(crate) fn store(&self) -> &LocalStateStore {
        &self.store
    }

    /// Swaps a provisional record for the canonical copy returned by a create.
    pub(crate) async fn reconciled(&self, provisional: RecordId, canonical: Entity, kind: IdKind) {
        let canonical_id = canonical.id().clone();
        let (changed, outcome) = self.dispatch(Action::Reconciled {
            provisional: provisional.clone(),
            canonical,
        });
        let detail = match outcome {
            Outcome::Reconciled(ReconcileOutcome::AlreadyPresent) => "already delivered by push",
            Outcome::Reconciled(ReconcileOutcome::Appended) => "appended",
            _ => "replaced in place",
        };
        self.notify(Notice::new(
            NoticeKind::Reconciled,
            kind,
            provisional,
            format!("now {canonical_id} ({detail})"),
        ));
        self.persist(changed).await;
    }

    /// Decodes a push event and merges it into the matching collection.
    ///
    /// Events for kinds the session does not track are ignored.
    pub(crate) async fn apply_push(&self, event: PushEvent) -> Result<Option<MergeOutcome>> {
        let entity = match event.entity_kind {
            IdKind::Project => Entity::Project(decode(&event.payload)?),
            IdKind::Conversation => Entity::Conversation(decode(&event.payload)?),
            IdKind::Message => Entity::Message(decode(&event.payload)?),
            IdKind::Quote => Entity::Quote(decode(&event.payload)?),
            other => {
                debug!("ignoring push for {} {}", other.name(), event.canonical_id);
                return Ok(None);
            }
        };
        if entity.id() != &event.canonical_id {
            return Err(TrackerError::persistence(
                "decode push payload",
                format!(
                    "payload id {} does not match event id {}",
                    entity.id(),
                    event.canonical_id
                ),
            ));
        }

        let (changed, outcome) = self.dispatch(Action::Pushed(entity));
        let merged = match outcome {
            Outcome::Merged(merged) => merged,
            _ => MergeOutcome::Unchanged,
        };
        if let MergeOutcome::Absorbed { provisional } = &merged {
            self.notify(Notice::new(
                NoticeKind::Absorbed,
                event.entity_kind,
                provisional.clone(),
                format!("confirmed as {}", event.canonical_id),
            ));
        }
        debug!("push {} on {}: {merged:?}", event.canonical_id, event.scope);
        self.persist(changed).await;
        Ok(Some(merged))
    }
}
