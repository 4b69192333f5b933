//! Error types for the tracking core.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Comprehensive error type for all tracking operations.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Caller-supplied input failed validation (missing or past forecast date)
    #[error("Invalid input for field '{field}': {reason}")]
    Validation { field: String, reason: String },
    /// A workflow or permission guard rejected the action
    #[error("Action not allowed: {reason}")]
    GuardViolation { reason: String },
    /// A call to the persistence gateway failed
    #[error("Persistence failure during {operation}: {reason}")]
    PersistenceFailure { operation: String, reason: String },
    /// Lookup by id or code yielded nothing
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
    /// Database connection or query errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: rusqlite::Error,
    },
    /// File system operation errors
    #[error("File system error at path '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        source: std::io::Error,
    },
    /// XDG directory specification errors
    #[error("XDG directory error: {0}")]
    XdgDirectory(String),
    /// Serialization/deserialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// The four failure classes callers reason about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    GuardViolation,
    PersistenceFailure,
    NotFound,
}

/// Builder for creating database errors with optional context.
pub struct DatabaseErrorBuilder {
    message: String,
}

impl DatabaseErrorBuilder {
    /// Create a new database error builder with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build the error with the given source.
    pub fn with_source(self, source: rusqlite::Error) -> TrackerError {
        TrackerError::Database {
            message: self.message,
            source,
        }
    }
}

/// Builder for creating input validation errors.
pub struct ValidationErrorBuilder {
    field: String,
}

impl ValidationErrorBuilder {
    /// Create a new validation error builder for a field.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Build the error with the given reason.
    pub fn with_reason(self, reason: impl Into<String>) -> TrackerError {
        TrackerError::Validation {
            field: self.field,
            reason: reason.into(),
        }
    }
}

impl TrackerError {
    /// Creates a builder for database errors.
    pub fn database(message: impl Into<String>) -> DatabaseErrorBuilder {
        DatabaseErrorBuilder::new(message)
    }

    /// Creates a builder for input validation errors.
    pub fn validation(field: impl Into<String>) -> ValidationErrorBuilder {
        ValidationErrorBuilder::new(field)
    }

    /// Creates a guard violation with the given reason.
    pub fn guard(reason: impl Into<String>) -> Self {
        Self::GuardViolation {
            reason: reason.into(),
        }
    }

    /// Creates a persistence failure for the named gateway operation.
    pub fn persistence(operation: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::PersistenceFailure {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a not-found error for an entity kind and id.
    pub fn not_found(kind: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Classifies the error into the taxonomy surfaced to callers.
    ///
    /// Infrastructure errors (database, file system, serialization) only ever
    /// arise at the gateway or cache boundary, so they count as persistence
    /// failures.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::GuardViolation { .. } => ErrorCategory::GuardViolation,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::PersistenceFailure { .. }
            | Self::Database { .. }
            | Self::FileSystem { .. }
            | Self::XdgDirectory(_)
            | Self::Serialization { .. }
            | Self::Configuration { .. } => ErrorCategory::PersistenceFailure,
        }
    }

    /// Wraps an error raised behind the gateway boundary as a persistence
    /// failure for `operation`. Persistence failures pass through unchanged.
    pub fn into_persistence(self, operation: &str) -> Self {
        match self {
            Self::PersistenceFailure { .. } => self,
            other => Self::persistence(operation, other),
        }
    }
}

/// Specialized extension trait for database-related Results.
pub trait DatabaseResultExt<T> {
    /// Map database errors with a message.
    fn db_context(self, message: &str) -> Result<T>;
}

impl<T> DatabaseResultExt<T> for std::result::Result<T, rusqlite::Error> {
    fn db_context(self, message: &str) -> Result<T> {
        self.map_err(|e| TrackerError::database(message).with_source(e))
    }
}

/// Result type alias for tracking operations
pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_mapping() {
        assert_eq!(
            TrackerError::validation("forecast_date")
                .with_reason("required")
                .category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            TrackerError::guard("locked").category(),
            ErrorCategory::GuardViolation
        );
        assert_eq!(
            TrackerError::not_found("project", "prj_1").category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            TrackerError::Configuration {
                message: "x".into()
            }
            .category(),
            ErrorCategory::PersistenceFailure
        );
    }

    #[test]
    fn test_into_persistence_wraps_gateway_errors() {
        let err = TrackerError::not_found("conversation", "cnv_9").into_persistence("create_message");
        match err {
            TrackerError::PersistenceFailure { operation, reason } => {
                assert_eq!(operation, "create_message");
                assert!(reason.contains("cnv_9"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = TrackerError::persistence("update_step", "offline").into_persistence("other");
        match err {
            TrackerError::PersistenceFailure { operation, .. } => assert_eq!(operation, "update_step"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_display_messages() {
        let err = TrackerError::not_found("step", "stp_4");
        assert_eq!(err.to_string(), "step 'stp_4' not found");
    }
}
