//! Reconciliation of provisional records with their canonical counterparts.
//!
//! A record created locally gets a provisional id and is appended to its
//! collection right away. When the store answers, [`reconcile_created`] swaps
//! it in place for the canonical record. Push events go through
//! [`merge_push`]: a known id updates in place, an event matching a pending
//! provisional record is absorbed into it, anything else is appended. Both
//! paths are idempotent, so a record that arrives twice (create response and
//! push echo) still occupies a single slot.
//!
//! Every provisional → canonical swap is remembered in [`IdAliases`] so late
//! references to the provisional id (a message sent to a conversation that was
//! still being created) can be rewritten with [`rebind_all`].
//!
//! A record can change locally while its create is in flight. Each path that
//! swaps in a canonical record takes the draft that was sent and re-applies
//! whatever the local copy changed since, so those edits survive the swap.

use std::collections::HashMap;

use jiff::{SignedDuration, Timestamp};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    models::{
        ConversationRecord, MessagePatch, MessageRecord, ProjectPatch, ProjectRecord, QuotePatch,
        QuoteRecord, RecordId, StepPatch,
    },
    timeline,
};

mod collection;

pub use collection::Collection;

/// Default tolerance when matching a push event against a provisional record.
pub const DEFAULT_CORRELATION_WINDOW: SignedDuration = SignedDuration::from_secs(10);

/// Provisional → canonical id mapping accumulated over a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdAliases {
    map: HashMap<RecordId, RecordId>,
}

impl IdAliases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, provisional: RecordId, canonical: RecordId) {
        if provisional != canonical {
            debug!("alias {provisional} -> {canonical}");
            self.map.insert(provisional, canonical);
        }
    }

    /// The canonical id recorded for `provisional`, if any.
    pub fn canonical_of(&self, provisional: &RecordId) -> Option<&RecordId> {
        self.map.get(provisional)
    }

    /// Resolves `id` to its canonical form, or returns it unchanged.
    pub fn resolve<'a>(&'a self, id: &'a RecordId) -> &'a RecordId {
        self.map.get(id).unwrap_or(id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Context for deciding whether two records describe the same entity.
#[derive(Debug, Clone, Copy)]
pub struct Correlation<'a> {
    pub aliases: &'a IdAliases,
    pub window: SignedDuration,
}

impl Correlation<'_> {
    /// Same entity once aliases are resolved.
    pub fn same(&self, a: &RecordId, b: &RecordId) -> bool {
        self.aliases.resolve(a) == self.aliases.resolve(b)
    }

    /// Within the correlation window of each other.
    pub fn close(&self, a: Timestamp, b: Timestamp) -> bool {
        a.duration_since(b).abs() <= self.window
    }
}

/// A record kept in a reconciled collection.
pub trait Reconcilable: Clone + PartialEq {
    fn record_id(&self) -> &RecordId;

    /// True when `incoming` (canonical) is the store's copy of `self`
    /// (provisional).
    fn correlates(&self, incoming: &Self, ctx: &Correlation<'_>) -> bool;

    /// Rewrites references to provisional ids. Returns true if anything
    /// changed.
    fn rebind(&mut self, _aliases: &IdAliases) -> bool {
        false
    }

    /// Records aliases for nested records when `self` is replaced by
    /// `canonical`.
    fn alias_children(&self, _canonical: &Self, _aliases: &mut IdAliases) {}

    /// Recomputes fields derived from the rest of the record.
    fn recompute_derived(&mut self) {}

    /// Re-applies onto `self` (canonical) what `local` changed after `sent`
    /// went to the store.
    fn carry_local_changes(&mut self, _sent: &Self, _local: &Self) {}
}

/// Result of swapping in a create response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The provisional record was replaced in place
    Replaced,
    /// A push event got there first; the canonical entry was refreshed
    AlreadyPresent,
    /// No provisional entry was found; the record was appended
    Appended,
}

/// Result of merging a push event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Identical record already present
    Unchanged,
    /// Known id updated in place
    Updated,
    /// Matched a pending provisional record and replaced it in place
    Absorbed { provisional: RecordId },
    /// New record appended at the tail
    Appended,
}

/// Appends a freshly created provisional record.
pub fn insert_provisional<R: Reconcilable>(collection: &Collection<R>, record: R) -> Collection<R> {
    collection.with(|items| items.push(record))
}

/// Replaces the provisional record `provisional_id` with `canonical`.
///
/// Length and order are preserved. If a push echo of the same record was
/// appended before the create returned, that duplicate is dropped. `sent` is
/// the draft the create sent; local changes made since are kept.
pub fn reconcile_created<R: Reconcilable>(
    collection: &Collection<R>,
    provisional_id: &RecordId,
    mut canonical: R,
    sent: Option<&R>,
    aliases: &mut IdAliases,
) -> (Collection<R>, ReconcileOutcome) {
    canonical.recompute_derived();
    let canonical_id = canonical.record_id().clone();
    let existing = collection.position(&canonical_id);

    match collection.position(provisional_id) {
        Some(slot) => {
            let local = &collection.as_slice()[slot];
            local.alias_children(&canonical, aliases);
            if let Some(sent) = sent {
                canonical.carry_local_changes(sent, local);
            }
            aliases.insert(provisional_id.clone(), canonical_id);
            let next = collection.with(|items| {
                items[slot] = canonical;
                if let Some(duplicate) = existing {
                    items.remove(duplicate);
                }
            });
            (next, ReconcileOutcome::Replaced)
        }
        None => {
            aliases.insert(provisional_id.clone(), canonical_id);
            let Some(slot) = existing else {
                return (
                    collection.with(|items| items.push(canonical)),
                    ReconcileOutcome::Appended,
                );
            };
            let local = &collection.as_slice()[slot];
            if let Some(sent) = sent {
                canonical.carry_local_changes(sent, local);
            }
            if *local == canonical {
                (collection.clone(), ReconcileOutcome::AlreadyPresent)
            } else {
                (
                    collection.with(|items| items[slot] = canonical),
                    ReconcileOutcome::AlreadyPresent,
                )
            }
        }
    }
}

/// Merges a push event into the collection.
///
/// `in_flight` holds the drafts of creates that have not answered yet, keyed
/// by provisional id.
pub fn merge_push<R: Reconcilable>(
    collection: &Collection<R>,
    mut incoming: R,
    aliases: &mut IdAliases,
    in_flight: &HashMap<RecordId, R>,
    window: SignedDuration,
) -> (Collection<R>, MergeOutcome) {
    incoming.recompute_derived();
    if let Some(slot) = collection.position(incoming.record_id()) {
        if collection.as_slice()[slot] == incoming {
            return (collection.clone(), MergeOutcome::Unchanged);
        }
        return (
            collection.with(|items| items[slot] = incoming),
            MergeOutcome::Updated,
        );
    }

    let correlated = {
        let ctx = Correlation {
            aliases: &*aliases,
            window,
        };
        collection
            .iter()
            .position(|r| r.record_id().is_provisional() && r.correlates(&incoming, &ctx))
    };

    match correlated {
        Some(slot) => {
            let local = &collection.as_slice()[slot];
            let provisional = local.record_id().clone();
            local.alias_children(&incoming, aliases);
            if let Some(sent) = in_flight.get(&provisional) {
                incoming.carry_local_changes(sent, local);
            }
            aliases.insert(provisional.clone(), incoming.record_id().clone());
            (
                collection.with(|items| items[slot] = incoming),
                MergeOutcome::Absorbed { provisional },
            )
        }
        None => (
            collection.with(|items| items.push(incoming)),
            MergeOutcome::Appended,
        ),
    }
}

/// Replaces the collection with freshly fetched records, keeping provisional
/// records that have no counterpart in `fetched` at the tail.
pub fn replace_preserving_provisional<R: Reconcilable>(
    fetched: Vec<R>,
    current: &Collection<R>,
    aliases: &mut IdAliases,
    in_flight: &HashMap<RecordId, R>,
    window: SignedDuration,
) -> Collection<R> {
    let mut items = fetched;
    for item in &mut items {
        item.recompute_derived();
    }

    let mut matched = Vec::new();
    let mut kept = Vec::new();
    {
        let ctx = Correlation {
            aliases: &*aliases,
            window,
        };
        for provisional in current.provisional() {
            match items.iter().position(|f| provisional.correlates(f, &ctx)) {
                Some(index) => matched.push((provisional, index)),
                None => kept.push(provisional.clone()),
            }
        }
    }
    for (provisional, index) in matched {
        let canonical = &mut items[index];
        provisional.alias_children(canonical, aliases);
        if let Some(sent) = in_flight.get(provisional.record_id()) {
            canonical.carry_local_changes(sent, provisional);
        }
        aliases.insert(
            provisional.record_id().clone(),
            canonical.record_id().clone(),
        );
    }

    items.extend(kept);
    Collection::new(items)
}

/// Rewrites provisional references in every record. Returns the same
/// collection when nothing changed.
pub fn rebind_all<R: Reconcilable>(collection: &Collection<R>, aliases: &IdAliases) -> Collection<R> {
    if aliases.is_empty() {
        return collection.clone();
    }
    let mut changed = false;
    let next = collection.with(|items| {
        for item in items {
            changed |= item.rebind(aliases);
        }
    });
    if changed {
        next
    } else {
        collection.clone()
    }
}

fn rebind_id(id: &mut RecordId, aliases: &IdAliases) -> bool {
    match aliases.canonical_of(id) {
        Some(canonical) => {
            *id = canonical.clone();
            true
        }
        None => false,
    }
}

impl Reconcilable for MessageRecord {
    fn record_id(&self) -> &RecordId {
        &self.id
    }

    fn correlates(&self, incoming: &Self, ctx: &Correlation<'_>) -> bool {
        ctx.same(&self.conversation_id, &incoming.conversation_id)
            && self.sender_id == incoming.sender_id
            && self.content == incoming.content
            && ctx.close(self.created_at, incoming.created_at)
    }

    fn rebind(&mut self, aliases: &IdAliases) -> bool {
        rebind_id(&mut self.conversation_id, aliases)
    }

    fn carry_local_changes(&mut self, sent: &Self, local: &Self) {
        MessagePatch::diff(sent, local).apply_to(self);
    }
}

impl Reconcilable for ConversationRecord {
    fn record_id(&self) -> &RecordId {
        &self.id
    }

    fn correlates(&self, incoming: &Self, ctx: &Correlation<'_>) -> bool {
        ctx.same(&self.project_id, &incoming.project_id)
    }

    fn rebind(&mut self, aliases: &IdAliases) -> bool {
        rebind_id(&mut self.project_id, aliases)
    }
}

impl Reconcilable for QuoteRecord {
    fn record_id(&self) -> &RecordId {
        &self.id
    }

    fn correlates(&self, incoming: &Self, ctx: &Correlation<'_>) -> bool {
        self.client_id == incoming.client_id
            && self.service_type == incoming.service_type
            && self.vehicle == incoming.vehicle
            && ctx.close(self.created_at, incoming.created_at)
    }

    fn rebind(&mut self, aliases: &IdAliases) -> bool {
        match self.project_id.as_mut() {
            Some(id) => rebind_id(id, aliases),
            None => false,
        }
    }

    fn carry_local_changes(&mut self, sent: &Self, local: &Self) {
        QuotePatch::diff(sent, local).apply_to(self);
    }
}

impl Reconcilable for ProjectRecord {
    fn record_id(&self) -> &RecordId {
        &self.id
    }

    fn correlates(&self, incoming: &Self, _ctx: &Correlation<'_>) -> bool {
        self.qr_code == incoming.qr_code
    }

    fn alias_children(&self, canonical: &Self, aliases: &mut IdAliases) {
        for (provisional, stored) in self.timeline.iter().zip(&canonical.timeline) {
            if provisional.position == stored.position {
                aliases.insert(provisional.id.clone(), stored.id.clone());
            }
        }
    }

    fn recompute_derived(&mut self) {
        timeline::recompute(self);
    }

    fn carry_local_changes(&mut self, sent: &Self, local: &Self) {
        for (before, after) in sent.timeline.iter().zip(&local.timeline) {
            let patch = StepPatch::diff(before, after);
            if patch.is_empty() {
                continue;
            }
            if let Some(step) = self
                .timeline
                .iter_mut()
                .find(|s| s.position == after.position)
            {
                patch.apply_to(step);
            }
        }
        ProjectPatch::diff(sent, local).apply_to(self);
        timeline::recompute(self);
    }
}
