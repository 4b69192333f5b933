use std::{collections::HashMap, sync::Arc};

use jiff::SignedDuration;
use log::{debug, warn};
use tokio::sync::Mutex;

use super::{
    outbox::Outbox,
    shared::Shared,
    state::{Action, Batch},
    Inner, ProjectStateController,
};
use crate::{
    blob::BlobStore,
    cache::{
        DurableCache, LocalStateStore, MemoryCache, CONVERSATIONS_KEY, MESSAGES_KEY,
        PROJECTS_KEY, QUOTES_KEY,
    },
    clock::{Clock, SystemClock},
    error::{Result, TrackerError},
    gateway::{DirectoryLookup, PersistenceGateway},
    models::{Actor, ProvisionalIds},
    push::RealtimePushBridge,
    reconcile::DEFAULT_CORRELATION_WINDOW,
};

/// Builder for creating ProjectStateController instances.
///
/// Only the acting user is required. Without a gateway the controller runs in
/// cache-only mode; without a cache it keeps state in memory.
pub struct ControllerBuilder {
    actor: Option<Actor>,
    gateway: Option<Arc<dyn PersistenceGateway>>,
    directory: Option<Arc<dyn DirectoryLookup>>,
    bridge: Option<Arc<dyn RealtimePushBridge>>,
    cache: Option<Arc<dyn DurableCache>>,
    blobs: Option<Arc<dyn BlobStore>>,
    clock: Option<Arc<dyn Clock>>,
    window: SignedDuration,
}

impl Default for ControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerBuilder {
    pub fn new() -> Self {
        Self {
            actor: None,
            gateway: None,
            directory: None,
            bridge: None,
            cache: None,
            blobs: None,
            clock: None,
            window: DEFAULT_CORRELATION_WINDOW,
        }
    }

    /// User on whose behalf every operation runs.
    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn PersistenceGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn with_directory(mut self, directory: Arc<dyn DirectoryLookup>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn with_push_bridge(mut self, bridge: Arc<dyn RealtimePushBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn DurableCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_blob_store(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Tolerance when matching a pushed record to a pending provisional one.
    pub fn with_correlation_window(mut self, window: SignedDuration) -> Self {
        self.window = window.abs();
        self
    }

    /// Builds the controller, restoring the last cached snapshot.
    ///
    /// Must be called from within a Tokio runtime; the outbox worker is
    /// spawned here.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Configuration` if no actor was given.
    pub async fn build(self) -> Result<ProjectStateController> {
        let actor = self.actor.ok_or_else(|| TrackerError::Configuration {
            message: "an acting user is required".to_string(),
        })?;
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MemoryCache::new()) as Arc<dyn DurableCache>);
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        let shared = Arc::new(Shared::new(LocalStateStore::new(cache), self.window));
        restore(&shared).await;

        let outbox = match &self.gateway {
            Some(gateway) => Outbox::spawn(Arc::clone(&shared), Arc::clone(gateway)),
            None => Outbox::disabled(),
        };
        debug!(
            "controller for {} {} ({})",
            actor.role.as_str(),
            actor.id,
            if outbox.is_enabled() { "online" } else { "cache only" }
        );

        Ok(ProjectStateController {
            inner: Arc::new(Inner {
                shared,
                outbox,
                actor,
                clock,
                ids: ProvisionalIds::new(),
                gateway: self.gateway,
                directory: self.directory,
                bridge: self.bridge,
                blobs: self.blobs,
                scopes: Mutex::new(HashMap::new()),
            }),
        })
    }
}

/// Loads every cached collection. A collection that cannot be read starts
/// empty.
async fn restore(shared: &Shared) {
    let store = shared.store();
    let batches = [
        store
            .load(PROJECTS_KEY)
            .await
            .map(|c| c.map(|c| Batch::Projects(c.to_vec()))),
        store
            .load(CONVERSATIONS_KEY)
            .await
            .map(|c| c.map(|c| Batch::Conversations(c.to_vec()))),
        store
            .load(MESSAGES_KEY)
            .await
            .map(|c| c.map(|c| Batch::Messages(c.to_vec()))),
        store
            .load(QUOTES_KEY)
            .await
            .map(|c| c.map(|c| Batch::Quotes(c.to_vec()))),
    ];
    for batch in batches {
        match batch {
            Ok(Some(batch)) => {
                shared.dispatch(Action::Restored(batch));
            }
            Ok(None) => {}
            Err(e) => warn!("ignoring unreadable cache entry: {e}"),
        }
    }
}
