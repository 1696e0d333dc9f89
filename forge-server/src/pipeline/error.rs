// Pipeline error types

use thiserror::Error;
use uuid::Uuid;

use super::validator::ValidationError;
use crate::integrations::IntegrationError;
use crate::persistence::PersistenceError;

/// Errors surfaced by pipeline operations
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Generated document is missing structural tags; nothing was committed
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Platform call failed (inference, storage, hosting, registry)
    #[error(transparent)]
    External(#[from] IntegrationError),

    /// Document store call failed
    #[error(transparent)]
    Storage(#[from] PersistenceError),

    /// Import file is not an application record or an array of them
    #[error("Import failed: {0}")]
    ImportParse(String),

    /// Stored record moved on since the caller read it
    #[error("Application {app_id} is at version {found}, expected {expected}; reload and retry")]
    VersionConflict {
        app_id: Uuid,
        expected: u32,
        found: u32,
    },

    /// Record was never persisted
    #[error("Application has no id; it was never saved")]
    Unsaved,

    /// Share payload could not be decoded
    #[error("Invalid share link: {0}")]
    InvalidShare(String),
}

impl PipelineError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::validator::validate_html;

    #[test]
    fn test_validation_error_passes_message_through() {
        let err: PipelineError = validate_html("<p>").unwrap_err().into();
        assert!(err.is_validation());
        assert!(err.to_string().starts_with("HTML validation failed:"));
    }

    #[test]
    fn test_version_conflict_display() {
        let err = PipelineError::VersionConflict {
            app_id: Uuid::nil(),
            expected: 2,
            found: 3,
        };
        let message = err.to_string();
        assert!(message.contains("version 3"));
        assert!(message.contains("expected 2"));
    }
}
