// Vibeforge Integration Layer - Error Types
//
// Errors raised at the platform boundary (auth, chat inference, storage,
// hosting, app registry). The pipeline decides per step whether one of these
// is fatal or tolerated.

use std::io;
use thiserror::Error;

/// Errors that can occur during platform capability calls
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrationError {
    /// No authenticated session
    #[error("Not signed in")]
    NotSignedIn,

    /// App registry already has an app with this name
    #[error("App name '{0}' is already taken")]
    NameConflict(String),

    /// Path, subdomain or app does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage call failed (unknown path, permissions)
    #[error("Filesystem error: {0}")]
    Filesystem(String),

    /// Hosting call failed
    #[error("Hosting error: {0}")]
    Hosting(String),

    /// App registry call failed
    #[error("App registry error: {0}")]
    Registry(String),

    /// Chat endpoint rejected the request or returned an error status
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Transport failure talking to a remote endpoint
    #[error("HTTP error: {0}")]
    Http(String),

    /// Timeout waiting for a remote response
    #[error("Timeout after {duration_secs}s waiting for: {operation}")]
    Timeout {
        operation: String,
        duration_secs: u64,
    },

    /// Response body could not be parsed
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Local I/O error
    #[error("I/O error: {0}")]
    IoError(String),
}

impl IntegrationError {
    pub fn is_name_conflict(&self) -> bool {
        matches!(self, Self::NameConflict(_))
    }
}

impl From<io::Error> for IntegrationError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            io::ErrorKind::PermissionDenied => Self::Filesystem(err.to_string()),
            io::ErrorKind::TimedOut => Self::Timeout {
                operation: "I/O".to_string(),
                duration_secs: 0,
            },
            _ => Self::IoError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for IntegrationError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<isahc::Error> for IntegrationError {
    fn from(err: isahc::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                operation: "chat request".to_string(),
                duration_secs: 0,
            }
        } else {
            Self::Http(err.to_string())
        }
    }
}

impl From<isahc::http::Error> for IntegrationError {
    fn from(err: isahc::http::Error) -> Self {
        Self::Http(err.to_string())
    }
}

/// Result type for integration operations
pub type IntegrationResult<T> = Result<T, IntegrationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IntegrationError::NameConflict("todo".to_string());
        assert!(err.to_string().contains("todo"));
        assert!(err.to_string().contains("already taken"));
        assert!(err.is_name_conflict());

        let err = IntegrationError::Timeout {
            operation: "chat".to_string(),
            duration_secs: 30,
        };
        assert!(err.to_string().contains("30s"));
        assert!(!err.is_name_conflict());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let int_err: IntegrationError = io_err.into();
        assert!(matches!(int_err, IntegrationError::NotFound(_)));

        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        let int_err: IntegrationError = io_err.into();
        assert!(matches!(int_err, IntegrationError::Filesystem(_)));
    }
}
