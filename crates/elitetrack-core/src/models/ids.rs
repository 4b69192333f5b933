//! Record identity: canonical ids assigned by the store and provisional ids
//! synthesized locally before the round-trip completes.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Prefix carried by every locally-synthesized identifier.
pub const PROVISIONAL_PREFIX: &str = "local-";

/// Kind of entity an identifier belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum IdKind {
    Project,
    Step,
    Conversation,
    Message,
    Quote,
    Client,
    Vehicle,
}

impl IdKind {
    /// Short tag used inside identifiers.
    pub fn tag(&self) -> &'static str {
        match self {
            IdKind::Project => "prj",
            IdKind::Step => "stp",
            IdKind::Conversation => "cnv",
            IdKind::Message => "msg",
            IdKind::Quote => "quo",
            IdKind::Client => "cli",
            IdKind::Vehicle => "veh",
        }
    }

    /// Human readable name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            IdKind::Project => "project",
            IdKind::Step => "step",
            IdKind::Conversation => "conversation",
            IdKind::Message => "message",
            IdKind::Quote => "quote",
            IdKind::Client => "client",
            IdKind::Vehicle => "vehicle",
        }
    }
}

/// Identifier of a record, either canonical (`prj_12`) or provisional
/// (`local-prj-1700000000000-3`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wraps a raw identifier string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Builds the canonical identifier for a store row.
    pub fn canonical(kind: IdKind, row_id: i64) -> Self {
        Self(format!("{}_{row_id}", kind.tag()))
    }

    /// Returns true when the id was synthesized locally.
    pub fn is_provisional(&self) -> bool {
        self.0.starts_with(PROVISIONAL_PREFIX)
    }

    /// Extracts the store row id when this is a canonical id of `kind`.
    pub fn row_id(&self, kind: IdKind) -> Option<i64> {
        self.0
            .strip_prefix(kind.tag())
            .and_then(|rest| rest.strip_prefix('_'))
            .and_then(|n| n.parse().ok())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Generator for provisional identifiers.
///
/// Ids are the provisional prefix, the entity tag, the creation timestamp in
/// milliseconds and a per-generator sequence number, so two records created
/// within the same millisecond still get distinct ids.
#[derive(Debug, Default)]
pub struct ProvisionalIds {
    sequence: AtomicU64,
}

impl ProvisionalIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synthesizes the next provisional id for `kind` created at `now`.
    pub fn next(&self, kind: IdKind, now: Timestamp) -> RecordId {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        RecordId(format!(
            "{PROVISIONAL_PREFIX}{}-{}-{seq}",
            kind.tag(),
            now.as_millisecond()
        ))
    }
}
