//! Realtime push events delivered per scope.
//!
//! A [`RealtimePushBridge`] hands out one [`Subscription`] per active scope
//! (a project, a conversation, or the quotes board). Events carry the
//! canonical record as a JSON payload; the controller validates and merges it
//! into the matching collection.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{
    error::Result,
    models::{IdKind, RecordId},
};

/// Unit of subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum ScopeId {
    /// A project and its timeline
    Project(RecordId),
    /// A conversation and its messages
    Conversation(RecordId),
    /// Every quote visible to the session
    Quotes,
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeId::Project(id) => write!(f, "project:{id}"),
            ScopeId::Conversation(id) => write!(f, "conversation:{id}"),
            ScopeId::Quotes => f.write_str("quotes"),
        }
    }
}

/// Whether the record was created or changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
}

/// A change notification from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEvent {
    pub entity_kind: IdKind,
    pub canonical_id: RecordId,
    pub change: ChangeKind,
    pub scope: ScopeId,

    /// Full canonical record as stored
    pub payload: serde_json::Value,
}

impl PushEvent {
    pub fn new<R: Serialize>(
        entity_kind: IdKind,
        canonical_id: RecordId,
        change: ChangeKind,
        scope: ScopeId,
        record: &R,
    ) -> Result<Self> {
        Ok(Self {
            entity_kind,
            canonical_id,
            change,
            scope,
            payload: serde_json::to_value(record)?,
        })
    }
}

/// Opaque token returned by [`RealtimePushBridge::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

/// An active subscription: its handle plus the stream of events.
#[derive(Debug)]
pub struct Subscription {
    pub handle: SubscriptionHandle,
    pub events: mpsc::UnboundedReceiver<PushEvent>,
}

/// Per-scope change feed.
#[async_trait]
pub trait RealtimePushBridge: Send + Sync {
    async fn subscribe(&self, scope: ScopeId) -> Result<Subscription>;
    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<()>;
}

struct Subscriber {
    scope: ScopeId,
    sender: mpsc::UnboundedSender<PushEvent>,
}

/// In-process fan-out bridge.
///
/// Writers call [`InProcessBridge::publish`] after a successful store write;
/// every subscriber of the event's scope gets a copy, including the writer's
/// own session.
#[derive(Default)]
pub struct InProcessBridge {
    next_handle: AtomicU64,
    subscribers: Mutex<HashMap<SubscriptionHandle, Subscriber>>,
}

impl InProcessBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to every subscriber of its scope.
    ///
    /// Subscribers whose receiver was dropped are removed.
    pub fn publish(&self, event: PushEvent) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        trace!(
            "publish {} {} to scope {}",
            event.entity_kind.name(),
            event.canonical_id,
            event.scope
        );
        subscribers.retain(|_, sub| {
            if sub.scope != event.scope {
                return true;
            }
            sub.sender.send(event.clone()).is_ok()
        });
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

#[async_trait]
impl RealtimePushBridge for InProcessBridge {
    async fn subscribe(&self, scope: ScopeId) -> Result<Subscription> {
        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let (sender, events) = mpsc::unbounded_channel();
        debug!("subscribe {scope} as {handle:?}");
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(handle, Subscriber { scope, sender });
        Ok(Subscription { handle, events })
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<()> {
        debug!("unsubscribe {handle:?}");
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(scope: ScopeId, id: &str) -> PushEvent {
        PushEvent {
            entity_kind: IdKind::Message,
            canonical_id: RecordId::new(id),
            change: ChangeKind::Insert,
            scope,
            payload: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_only_matching_scope() {
        let bridge = InProcessBridge::new();
        let chat = ScopeId::Conversation(RecordId::new("cnv_1"));
        let mut a = bridge.subscribe(chat.clone()).await.unwrap();
        let mut b = bridge.subscribe(ScopeId::Quotes).await.unwrap();

        bridge.publish(event(chat, "msg_1"));

        let got = a.events.recv().await.unwrap();
        assert_eq!(got.canonical_id, RecordId::new("msg_1"));
        assert!(b.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsubscribe_and_dropped_receivers_are_pruned() {
        let bridge = InProcessBridge::new();
        let scope = ScopeId::Project(RecordId::new("prj_1"));
        let first = bridge.subscribe(scope.clone()).await.unwrap();
        let second = bridge.subscribe(scope.clone()).await.unwrap();
        assert_eq!(bridge.subscriber_count(), 2);

        bridge.unsubscribe(first.handle).await.unwrap();
        assert_eq!(bridge.subscriber_count(), 1);

        drop(second);
        bridge.publish(event(scope, "prj_1"));
        assert_eq!(bridge.subscriber_count(), 0);
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(
            ScopeId::Conversation(RecordId::new("cnv_2")).to_string(),
            "conversation:cnv_2"
        );
        assert_eq!(ScopeId::Quotes.to_string(), "quotes");
    }
}
