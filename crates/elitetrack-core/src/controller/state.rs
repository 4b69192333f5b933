//! Session state and the reducer that mutates it.
//!
//! Every change to the local collections goes through [`reduce`]. It never
//! touches a collection in place; each affected collection is rebuilt and the
//! rest keep their previous allocation, so observers can compare snapshots
//! cheaply.

use std::collections::HashMap;

use jiff::SignedDuration;
use log::debug;

use crate::{
    models::{ConversationRecord, MessageRecord, ProjectRecord, QuoteRecord, RecordId},
    reconcile::{
        insert_provisional, merge_push, rebind_all, reconcile_created,
        replace_preserving_provisional, Collection, IdAliases, MergeOutcome, Reconcilable,
        ReconcileOutcome,
    },
};

/// Everything the UI renders, as of one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub projects: Collection<ProjectRecord>,
    pub conversations: Collection<ConversationRecord>,
    pub messages: Collection<MessageRecord>,
    pub quotes: Collection<QuoteRecord>,

    /// Provisional → canonical ids seen this session
    pub aliases: IdAliases,

    /// Project the UI currently focuses on
    pub selected_project: Option<RecordId>,

    /// Drafts handed to the store whose create has not answered yet
    pub in_flight: InFlight,
}

/// Sent drafts per kind, keyed by provisional id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InFlight {
    pub projects: HashMap<RecordId, ProjectRecord>,
    pub conversations: HashMap<RecordId, ConversationRecord>,
    pub messages: HashMap<RecordId, MessageRecord>,
    pub quotes: HashMap<RecordId, QuoteRecord>,
}

impl InFlight {
    fn insert(&mut self, draft: Entity) {
        match draft {
            Entity::Project(r) => {
                self.projects.insert(r.id.clone(), r);
            }
            Entity::Conversation(r) => {
                self.conversations.insert(r.id.clone(), r);
            }
            Entity::Message(r) => {
                self.messages.insert(r.id.clone(), r);
            }
            Entity::Quote(r) => {
                self.quotes.insert(r.id.clone(), r);
            }
        }
    }

    fn remove(&mut self, id: &RecordId) {
        self.projects.remove(id);
        self.conversations.remove(id);
        self.messages.remove(id);
        self.quotes.remove(id);
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
            && self.conversations.is_empty()
            && self.messages.is_empty()
            && self.quotes.is_empty()
    }
}

impl SessionState {
    /// Looks up a project by id, following aliases of provisional ids.
    pub fn project(&self, id: &RecordId) -> Option<&ProjectRecord> {
        self.projects
            .get(id)
            .or_else(|| self.projects.get(self.aliases.resolve(id)))
    }

    pub fn conversation(&self, id: &RecordId) -> Option<&ConversationRecord> {
        self.conversations
            .get(id)
            .or_else(|| self.conversations.get(self.aliases.resolve(id)))
    }

    pub fn quote(&self, id: &RecordId) -> Option<&QuoteRecord> {
        self.quotes
            .get(id)
            .or_else(|| self.quotes.get(self.aliases.resolve(id)))
    }

    pub fn message(&self, id: &RecordId) -> Option<&MessageRecord> {
        self.messages
            .get(id)
            .or_else(|| self.messages.get(self.aliases.resolve(id)))
    }

    /// The conversation attached to `project_id`, if any.
    pub fn conversation_for_project(&self, project_id: &RecordId) -> Option<&ConversationRecord> {
        let project_id = self.aliases.resolve(project_id);
        self.conversations
            .iter()
            .find(|c| self.aliases.resolve(&c.project_id) == project_id)
    }

    /// Messages of one conversation in creation order.
    pub fn messages_in<'a>(
        &'a self,
        conversation_id: &'a RecordId,
    ) -> impl Iterator<Item = &'a MessageRecord> + 'a {
        let conversation_id = self.aliases.resolve(conversation_id);
        self.messages
            .iter()
            .filter(move |m| self.aliases.resolve(&m.conversation_id) == conversation_id)
    }
}

/// A record of any reconciled kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Project(ProjectRecord),
    Conversation(ConversationRecord),
    Message(MessageRecord),
    Quote(QuoteRecord),
}

impl Entity {
    pub fn id(&self) -> &RecordId {
        match self {
            Entity::Project(r) => &r.id,
            Entity::Conversation(r) => &r.id,
            Entity::Message(r) => &r.id,
            Entity::Quote(r) => &r.id,
        }
    }
}

/// A whole collection's worth of records.
#[derive(Debug, Clone, PartialEq)]
pub enum Batch {
    Projects(Vec<ProjectRecord>),
    Conversations(Vec<ConversationRecord>),
    Messages(Vec<MessageRecord>),
    Quotes(Vec<QuoteRecord>),
}

/// State transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Append a freshly created provisional record
    Optimistic(Entity),
    /// Swap an existing record for a locally edited copy
    Replace(Entity),
    /// A create is about to send this draft
    Sending(Entity),
    /// The create for this provisional id failed
    Unsent(RecordId),
    /// A create round-trip returned the canonical record
    Reconciled {
        provisional: RecordId,
        canonical: Entity,
    },
    /// A push event arrived
    Pushed(Entity),
    /// A fetch returned the authoritative collection
    Fetched(Batch),
    /// Collection loaded from the durable cache
    Restored(Batch),
    /// Flag the given messages as read
    MarkRead(Vec<RecordId>),
    /// Focus a project
    Select(Option<RecordId>),
}

/// Which collections an action rebuilt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Changed {
    pub projects: bool,
    pub conversations: bool,
    pub messages: bool,
    pub quotes: bool,
    pub selection: bool,
}

impl Changed {
    pub fn any(&self) -> bool {
        self.projects || self.conversations || self.messages || self.quotes || self.selection
    }

    /// Accumulates the flags of a later action.
    pub fn merge(&mut self, other: Changed) {
        self.projects |= other.projects;
        self.conversations |= other.conversations;
        self.messages |= other.messages;
        self.quotes |= other.quotes;
        self.selection |= other.selection;
    }

    /// True when a cached collection changed.
    pub fn collections(&self) -> bool {
        self.projects || self.conversations || self.messages || self.quotes
    }
}

/// What happened to the record an action targeted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    None,
    Reconciled(ReconcileOutcome),
    Merged(MergeOutcome),
}

fn replace_by_id<R: Reconcilable>(collection: &Collection<R>, record: R) -> Option<Collection<R>> {
    let slot = collection.position(record.record_id())?;
    if collection.as_slice()[slot] == record {
        return None;
    }
    Some(collection.with(|items| items[slot] = record))
}

fn set<R>(target: &mut Collection<R>, next: Collection<R>) -> bool {
    if target.ptr_eq(&next) {
        false
    } else {
        *target = next;
        true
    }
}

fn optimistic(state: &mut SessionState, entity: Entity, changed: &mut Changed) {
    match entity {
        Entity::Project(r) => {
            state.projects = insert_provisional(&state.projects, r);
            changed.projects = true;
        }
        Entity::Conversation(r) => {
            state.conversations = insert_provisional(&state.conversations, r);
            changed.conversations = true;
        }
        Entity::Message(r) => {
            state.messages = insert_provisional(&state.messages, r);
            changed.messages = true;
        }
        Entity::Quote(r) => {
            state.quotes = insert_provisional(&state.quotes, r);
            changed.quotes = true;
        }
    }
}

fn replace(state: &mut SessionState, entity: Entity, changed: &mut Changed) {
    match entity {
        Entity::Project(r) => {
            if let Some(next) = replace_by_id(&state.projects, r) {
                changed.projects = set(&mut state.projects, next);
            }
        }
        Entity::Conversation(r) => {
            if let Some(next) = replace_by_id(&state.conversations, r) {
                changed.conversations = set(&mut state.conversations, next);
            }
        }
        Entity::Message(r) => {
            if let Some(next) = replace_by_id(&state.messages, r) {
                changed.messages = set(&mut state.messages, next);
            }
        }
        Entity::Quote(r) => {
            if let Some(next) = replace_by_id(&state.quotes, r) {
                changed.quotes = set(&mut state.quotes, next);
            }
        }
    }
}

fn reconciled(
    state: &mut SessionState,
    provisional: &RecordId,
    canonical: Entity,
    changed: &mut Changed,
) -> ReconcileOutcome {
    let aliases = &mut state.aliases;
    let in_flight = &mut state.in_flight;
    match canonical {
        Entity::Project(r) => {
            let sent = in_flight.projects.remove(provisional);
            let (next, result) =
                reconcile_created(&state.projects, provisional, r, sent.as_ref(), aliases);
            changed.projects = set(&mut state.projects, next);
            if state.selected_project.as_ref() == Some(provisional) {
                state.selected_project = aliases.canonical_of(provisional).cloned();
                changed.selection = true;
            }
            result
        }
        Entity::Conversation(r) => {
            let sent = in_flight.conversations.remove(provisional);
            let (next, result) =
                reconcile_created(&state.conversations, provisional, r, sent.as_ref(), aliases);
            changed.conversations = set(&mut state.conversations, next);
            result
        }
        Entity::Message(r) => {
            let sent = in_flight.messages.remove(provisional);
            let (next, result) =
                reconcile_created(&state.messages, provisional, r, sent.as_ref(), aliases);
            changed.messages = set(&mut state.messages, next);
            result
        }
        Entity::Quote(r) => {
            let sent = in_flight.quotes.remove(provisional);
            let (next, result) =
                reconcile_created(&state.quotes, provisional, r, sent.as_ref(), aliases);
            changed.quotes = set(&mut state.quotes, next);
            result
        }
    }
}

fn pushed(
    state: &mut SessionState,
    entity: Entity,
    window: SignedDuration,
    changed: &mut Changed,
) -> MergeOutcome {
    let aliases = &mut state.aliases;
    let in_flight = &state.in_flight;
    match entity {
        Entity::Project(r) => {
            let (next, result) =
                merge_push(&state.projects, r, aliases, &in_flight.projects, window);
            changed.projects = set(&mut state.projects, next);
            result
        }
        Entity::Conversation(r) => {
            let (next, result) = merge_push(
                &state.conversations,
                r,
                aliases,
                &in_flight.conversations,
                window,
            );
            changed.conversations = set(&mut state.conversations, next);
            result
        }
        Entity::Message(r) => {
            let (next, result) =
                merge_push(&state.messages, r, aliases, &in_flight.messages, window);
            changed.messages = set(&mut state.messages, next);
            result
        }
        Entity::Quote(r) => {
            let (next, result) = merge_push(&state.quotes, r, aliases, &in_flight.quotes, window);
            changed.quotes = set(&mut state.quotes, next);
            result
        }
    }
}

fn fetched(state: &mut SessionState, batch: Batch, window: SignedDuration, changed: &mut Changed) {
    let aliases = &mut state.aliases;
    let in_flight = &state.in_flight;
    match batch {
        Batch::Projects(records) => {
            state.projects = replace_preserving_provisional(
                records,
                &state.projects,
                aliases,
                &in_flight.projects,
                window,
            );
            changed.projects = true;
        }
        Batch::Conversations(records) => {
            state.conversations = replace_preserving_provisional(
                records,
                &state.conversations,
                aliases,
                &in_flight.conversations,
                window,
            );
            changed.conversations = true;
        }
        Batch::Messages(records) => {
            state.messages = replace_preserving_provisional(
                records,
                &state.messages,
                aliases,
                &in_flight.messages,
                window,
            );
            changed.messages = true;
        }
        Batch::Quotes(records) => {
            state.quotes = replace_preserving_provisional(
                records,
                &state.quotes,
                aliases,
                &in_flight.quotes,
                window,
            );
            changed.quotes = true;
        }
    }
}

fn restored(state: &mut SessionState, batch: Batch, changed: &mut Changed) {
    match batch {
        Batch::Projects(records) => {
            state.projects = Collection::new(records);
            changed.projects = true;
        }
        Batch::Conversations(records) => {
            state.conversations = Collection::new(records);
            changed.conversations = true;
        }
        Batch::Messages(records) => {
            state.messages = Collection::new(records);
            changed.messages = true;
        }
        Batch::Quotes(records) => {
            state.quotes = Collection::new(records);
            changed.quotes = true;
        }
    }
}

fn mark_read(state: &mut SessionState, ids: &[RecordId], changed: &mut Changed) {
    let unread = state
        .messages
        .iter()
        .any(|m| !m.read && ids.contains(&m.id));
    if unread {
        state.messages = state.messages.with(|items| {
            for message in items.iter_mut().filter(|m| ids.contains(&m.id)) {
                message.read = true;
            }
        });
        changed.messages = true;
    }
}

/// Applies `action` to `state`.
pub fn reduce(state: &mut SessionState, action: Action, window: SignedDuration) -> (Changed, Outcome) {
    let mut changed = Changed::default();
    let mut outcome = Outcome::None;
    let aliases_before = state.aliases.len();

    match action {
        Action::Optimistic(entity) => optimistic(state, entity, &mut changed),
        Action::Replace(entity) => replace(state, entity, &mut changed),
        Action::Sending(draft) => state.in_flight.insert(draft),
        Action::Unsent(provisional) => state.in_flight.remove(&provisional),
        Action::Reconciled {
            provisional,
            canonical,
        } => {
            let result = reconciled(state, &provisional, canonical, &mut changed);
            outcome = Outcome::Reconciled(result);
        }
        Action::Pushed(entity) => {
            let result = pushed(state, entity, window, &mut changed);
            outcome = Outcome::Merged(result);
        }
        Action::Fetched(batch) => fetched(state, batch, window, &mut changed),
        Action::Restored(batch) => restored(state, batch, &mut changed),
        Action::MarkRead(ids) => mark_read(state, &ids, &mut changed),
        Action::Select(project) => {
            if state.selected_project != project {
                state.selected_project = project;
                changed.selection = true;
            }
        }
    }

    if state.aliases.len() != aliases_before {
        let conversations = rebind_all(&state.conversations, &state.aliases);
        changed.conversations |= set(&mut state.conversations, conversations);
        let messages = rebind_all(&state.messages, &state.aliases);
        changed.messages |= set(&mut state.messages, messages);
        let quotes = rebind_all(&state.quotes, &state.aliases);
        changed.quotes |= set(&mut state.quotes, quotes);
    }

    debug!("reduced: {changed:?} {outcome:?}");
    (changed, outcome)
}
