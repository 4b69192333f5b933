//! The project state controller: the one object UI code talks to.
//!
//! The controller owns the session's [`SessionState`] and applies every user
//! intent in three moves:
//!
//! 1. guards run against the current state (timeline rules, quote pipeline,
//!    permissions) and reject synchronously with nothing changed;
//! 2. the optimistic result is applied to the state right away and written
//!    to the durable cache;
//! 3. the matching gateway write is queued on the ordered outbox, and the
//!    returned [`PendingWrite`] settles once the store answered.
//!
//! Failed writes never undo local state. They are reported on the notice
//! channel ([`ProjectStateController::notices`]) and through
//! [`PendingWrite::settled`].
//!
//! Push events from an active scope are merged into the same collections, and
//! [`ProjectStateController::refresh`] replaces them wholesale from the store
//! while keeping records still waiting for their create round-trip.

use std::{collections::HashMap, sync::Arc};

use log::{debug, error, info, warn};
use tokio::{
    sync::{broadcast, watch, Mutex},
    task::JoinHandle,
};

use crate::{
    blob::BlobStore,
    clock::Clock,
    error::{Result, TrackerError},
    gateway::{DirectoryLookup, PersistenceGateway},
    models::{Actor, ClientProfile, ProvisionalIds, RecordId, Vehicle},
    push::{PushEvent, RealtimePushBridge, ScopeId, SubscriptionHandle},
    reconcile::MergeOutcome,
};

mod builder;
mod chat;
mod notice;
mod outbox;
mod projects;
mod quotes;
mod refresh;
mod shared;
mod state;

pub use builder::ControllerBuilder;
pub use notice::{Notice, NoticeKind};
pub use outbox::PendingWrite;
pub use state::{reduce, Action, Batch, Changed, Entity, InFlight, Outcome, SessionState};

use outbox::Outbox;
use shared::Shared;

struct ActiveScope {
    handle: SubscriptionHandle,
    listener: JoinHandle<()>,
}

struct Inner {
    shared: Arc<Shared>,
    outbox: Outbox,
    actor: Actor,
    clock: Arc<dyn Clock>,
    ids: ProvisionalIds,
    gateway: Option<Arc<dyn PersistenceGateway>>,
    directory: Option<Arc<dyn DirectoryLookup>>,
    bridge: Option<Arc<dyn RealtimePushBridge>>,
    blobs: Option<Arc<dyn BlobStore>>,
    scopes: Mutex<HashMap<ScopeId, ActiveScope>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        for scope in self.scopes.get_mut().values() {
            scope.listener.abort();
        }
    }
}

/// Session controller for one acting user.
///
/// Cloning is cheap and every clone drives the same session.
#[derive(Clone)]
pub struct ProjectStateController {
    inner: Arc<Inner>,
}

impl ProjectStateController {
    pub fn builder() -> ControllerBuilder {
        ControllerBuilder::new()
    }

    /// Current state snapshot.
    pub fn state(&self) -> SessionState {
        self.inner.shared.snapshot()
    }

    /// Receiver that wakes on every state change.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.inner.shared.state.subscribe()
    }

    /// Receiver for asynchronous outcomes (failed writes, reconciliations).
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.inner.shared.notices.subscribe()
    }

    pub fn actor(&self) -> &Actor {
        &self.inner.actor
    }

    /// True when no gateway is configured and the session runs on the cache.
    pub fn is_offline(&self) -> bool {
        !self.inner.outbox.is_enabled()
    }

    fn now(&self) -> jiff::Timestamp {
        self.inner.clock.now()
    }

    fn directory(&self) -> Result<&dyn DirectoryLookup> {
        self.inner
            .directory
            .as_deref()
            .ok_or_else(|| TrackerError::Configuration {
                message: "no directory lookup configured".to_string(),
            })
    }

    /// Resolves a client reference.
    pub async fn client(&self, id: &RecordId) -> Result<ClientProfile> {
        self.directory()?
            .client(id)
            .await
            .map_err(|e| e.into_persistence("look up client"))?
            .ok_or_else(|| TrackerError::not_found("client", id))
    }

    /// Resolves a vehicle reference.
    pub async fn vehicle(&self, id: &RecordId) -> Result<Vehicle> {
        self.directory()?
            .vehicle(id)
            .await
            .map_err(|e| e.into_persistence("look up vehicle"))?
            .ok_or_else(|| TrackerError::not_found("vehicle", id))
    }

    /// Subscribes to push events for `scope`. Activating an active scope or
    /// running without a bridge does nothing.
    pub async fn activate_scope(&self, scope: ScopeId) -> Result<()> {
        let Some(bridge) = &self.inner.bridge else {
            debug!("no push bridge; scope {scope} stays inactive");
            return Ok(());
        };
        let scope = self.canonical_scope(scope);
        let mut scopes = self.inner.scopes.lock().await;
        if scopes.contains_key(&scope) {
            return Ok(());
        }

        let subscription = bridge
            .subscribe(scope.clone())
            .await
            .map_err(|e| e.into_persistence("subscribe"))?;
        let handle = subscription.handle;
        let mut events = subscription.events;
        let shared = Arc::clone(&self.inner.shared);
        let label = scope.to_string();
        let listener = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let (kind, id) = (event.entity_kind, event.canonical_id.clone());
                if let Err(e) = shared.apply_push(event).await {
                    warn!("dropping push event on {label}: {e}");
                    shared.notify(Notice::new(
                        NoticeKind::PersistenceFailure,
                        kind,
                        id,
                        e.to_string(),
                    ));
                }
            }
            debug!("push stream for {label} ended");
        });

        info!("activated scope {scope}");
        scopes.insert(scope, ActiveScope { handle, listener });
        Ok(())
    }

    /// Tears down the subscription for `scope`.
    pub async fn deactivate_scope(&self, scope: &ScopeId) -> Result<()> {
        let scope = self.canonical_scope(scope.clone());
        let Some(active) = self.inner.scopes.lock().await.remove(&scope) else {
            return Ok(());
        };
        active.listener.abort();
        if let Some(bridge) = &self.inner.bridge {
            bridge
                .unsubscribe(active.handle)
                .await
                .map_err(|e| e.into_persistence("unsubscribe"))?;
        }
        info!("deactivated scope {scope}");
        Ok(())
    }

    pub async fn active_scopes(&self) -> Vec<ScopeId> {
        let mut scopes: Vec<_> = self.inner.scopes.lock().await.keys().cloned().collect();
        scopes.sort_by_key(ToString::to_string);
        scopes
    }

    /// Deactivates every scope. Queued writes keep running.
    pub async fn shutdown(&self) {
        for scope in self.active_scopes().await {
            if let Err(e) = self.deactivate_scope(&scope).await {
                error!("failed to deactivate {scope}: {e}");
            }
        }
    }

    /// Merges a push event delivered by other means than an active scope.
    pub async fn apply_push(&self, event: PushEvent) -> Result<Option<MergeOutcome>> {
        self.inner.shared.apply_push(event).await
    }

    fn canonical_scope(&self, scope: ScopeId) -> ScopeId {
        let resolve = |id: RecordId| {
            self.inner
                .shared
                .read(|s| s.aliases.resolve(&id).clone())
        };
        match scope {
            ScopeId::Project(id) => ScopeId::Project(resolve(id)),
            ScopeId::Conversation(id) => ScopeId::Conversation(resolve(id)),
            ScopeId::Quotes => ScopeId::Quotes,
        }
    }
}
