// Persistence error types

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during persistence operations
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Database connection failed
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),
    /// Database query failed
    #[error("Database query failed: {0}")]
    QueryFailed(String),
    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),
    /// Serialization error (JSON documents)
    #[error("Serialization error: {0}")]
    SerializationError(String),
    /// No document with this id
    #[error("Document not found: {0}")]
    NotFound(Uuid),
    /// Document exists but has another `type`
    #[error("Document {id} is not an {expected} document")]
    WrongKind { id: Uuid, expected: &'static str },
    /// Record was never written, so it has no id yet
    #[error("Record has not been persisted yet")]
    Unsaved,
    /// Database pool exhausted
    #[error("Database connection pool exhausted")]
    PoolExhausted,
    /// Snapshot file could not be read or written
    #[error("Snapshot I/O failed: {0}")]
    Io(String),
}

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::QueryFailed("Row not found".to_string()),
            sqlx::Error::PoolTimedOut => Self::PoolExhausted,
            sqlx::Error::PoolClosed => Self::ConnectionFailed("Pool closed".to_string()),
            _ => Self::QueryFailed(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for PersistenceError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;
