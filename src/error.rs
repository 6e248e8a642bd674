//! Mimir error types

use std::time::Duration;

/// Mimir error types
#[derive(Debug, thiserror::Error)]
pub enum MimirError {
    // Request admission
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    // Backend/network errors
    #[error("all candidate backends exhausted (last model: {model}): {reason}")]
    UpstreamUnavailable { model: String, reason: String },

    #[error("backend call timed out for model '{model}'")]
    Timeout { model: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("empty response from model")]
    EmptyResponse,

    #[error("model not found: {0}")]
    ModelNotFound(String),

    // Migration control surface (caller errors, never retried)
    #[error("a migration is already in progress")]
    MigrationInProgress,

    #[error("no active migration")]
    NoActiveMigration,

    #[error("invalid migration parameters: {0}")]
    InvalidMigration(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl MimirError {
    /// Whether the error counts as a backend failure that should trigger
    /// the single retry against the next-ranked candidate.
    ///
    /// Timeouts and transport-level errors qualify; admission and
    /// migration errors do not.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            MimirError::Timeout { .. }
                | MimirError::Http(_)
                | MimirError::Api { .. }
                | MimirError::EmptyResponse
        )
    }
}

/// Result type alias for Mimir operations
pub type Result<T> = std::result::Result<T, MimirError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_failures_are_retryable() {
        assert!(MimirError::Timeout { model: "m".into() }.is_backend_failure());
        assert!(MimirError::Http("reset".into()).is_backend_failure());
        assert!(MimirError::EmptyResponse.is_backend_failure());
    }

    #[test]
    fn caller_errors_are_not_retryable() {
        assert!(
            !MimirError::RateLimited {
                retry_after: Duration::from_secs(1)
            }
            .is_backend_failure()
        );
        assert!(!MimirError::MigrationInProgress.is_backend_failure());
        assert!(!MimirError::ModelNotFound("x".into()).is_backend_failure());
    }
}
