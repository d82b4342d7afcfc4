//! Core error types for recoverydesk-core.
//!
//! This module defines the error hierarchy using thiserror. Lookups that miss
//! a record, rejected alert transitions and backend failures each get their
//! own variant so the CLI can report them without string matching.

use std::path::PathBuf;
use thiserror::Error;

use crate::alerts::AlertTransitionError;

/// Core error type for recoverydesk-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A referenced record does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },

    /// The alert state machine rejected the requested action
    #[error(transparent)]
    InvalidTransition(#[from] AlertTransitionError),

    /// A conditional update found the record in an unexpected state
    #[error("Alert {id} was modified concurrently; reload and retry")]
    Conflict { id: String },

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn alert_not_found(id: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind: RecordKind::Alert,
            id: id.into(),
        }
    }

    pub fn client_not_found(id: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind: RecordKind::Client,
            id: id.into(),
        }
    }

    pub fn check_in_not_found(id: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind: RecordKind::CheckIn,
            id: id.into(),
        }
    }

    /// True for any "record does not exist" failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound { .. })
    }
}

/// The kind of record a [`CoreError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Alert,
    Client,
    CheckIn,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RecordKind::Alert => "Alert",
            RecordKind::Client => "Client",
            RecordKind::CheckIn => "Check-in",
        };
        f.write_str(name)
    }
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be decoded
    #[error("Corrupt value in column '{column}': {value}")]
    CorruptValue { column: String, value: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Could not determine where to keep data
    #[error("Cannot determine data directory: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Snooze target is not in the future
    #[error("Snooze time {until} must be after {now}")]
    SnoozeNotInFuture {
        until: chrono::DateTime<chrono::Utc>,
        now: chrono::DateTime<chrono::Utc>,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(DatabaseError::from(err))
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_kind_and_id() {
        let err = CoreError::alert_not_found("a-1");
        assert_eq!(err.to_string(), "Alert not found: a-1");
        assert!(err.is_not_found());

        let err = CoreError::check_in_not_found("c-9");
        assert_eq!(err.to_string(), "Check-in not found: c-9");
    }

    #[test]
    fn locked_sqlite_maps_to_locked() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(matches!(DatabaseError::from(err), DatabaseError::Locked));
    }
}
