//! Data models for projects, timelines, chat and quotes.
//!
//! Records are plain serde structs. Identifiers are [`RecordId`]s, which are
//! either canonical (assigned by the store) or provisional (synthesized
//! locally while a create is in flight). Display implementations live in
//! [`crate::display`].
//!
//! References between records are ids only: a project points at its client
//! and vehicle by id and the [`DirectoryLookup`](crate::gateway::DirectoryLookup)
//! resolves them.

pub mod chat;
pub mod directory;
pub mod filters;
pub mod ids;
pub mod patches;
pub mod project;
pub mod quote;
pub mod status;
pub mod step;

#[cfg(test)]
mod tests;

pub use chat::{ConversationRecord, MessageRecord};
pub use directory::{Actor, ClientProfile, Vehicle};
pub use filters::{ConversationFilter, MessageFilter, ProjectFilter, QuoteFilter};
pub use ids::{IdKind, ProvisionalIds, RecordId, PROVISIONAL_PREFIX};
pub use patches::{MessagePatch, ProjectPatch, QuotePatch, StepPatch};
pub use project::ProjectRecord;
pub use quote::{QuoteAction, QuoteRecord, QuoteVehicle};
pub use status::{ProjectStatus, QuoteStatus, Role, StepStatus};
pub use step::TimelineStep;
