//! Side channel for outcomes that happen after an operation returned.

use std::fmt;

use serde::Serialize;

use crate::models::{IdKind, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// A gateway call failed; local state was kept
    PersistenceFailure,
    /// A provisional record was swapped for its canonical copy
    Reconciled,
    /// A push event was matched to a pending provisional record
    Absorbed,
    /// A fetch failed and the cached snapshot stays in use
    Fallback,
}

/// One asynchronous outcome, broadcast to every subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub entity: IdKind,

    /// Record concerned; `None` for collection-wide notices
    pub id: Option<RecordId>,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, entity: IdKind, id: RecordId, message: impl Into<String>) -> Self {
        Self {
            kind,
            entity,
            id: Some(id),
            message: message.into(),
        }
    }

    /// A fetch of `entity` records failed and cached data stays in use.
    pub fn fallback(entity: IdKind, message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Fallback,
            entity,
            id: None,
            message: message.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.kind, NoticeKind::PersistenceFailure | NoticeKind::Fallback)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            NoticeKind::PersistenceFailure => "write failed",
            NoticeKind::Reconciled => "stored",
            NoticeKind::Absorbed => "confirmed",
            NoticeKind::Fallback => "offline",
        };
        match &self.id {
            Some(id) => write!(f, "{label}: {} {id}: {}", self.entity.name(), self.message),
            None => write!(f, "{label}: {}s: {}", self.entity.name(), self.message),
        }
    }
}
