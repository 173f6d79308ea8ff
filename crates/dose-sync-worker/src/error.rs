//! Sync error types.

use thiserror::Error;

/// Error type for a single delivery attempt or a sync pass setup step.
///
/// None of these are surfaced to the user directly; a failed delivery only
/// shows up as the event remaining in the pending count.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network or transport-level HTTP error from reqwest.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote ingress answered with a non-success status.
    #[error("Remote error: {status} - {message}")]
    Remote {
        /// The HTTP status code returned by the ingress.
        status: u16,
        /// Summary of the response body.
        message: String,
    },

    /// Credentials missing, rejected or not refreshable.
    #[error("Auth error: {0}")]
    Auth(String),

    /// Local store failure while reading or reconciling.
    #[error("Database error: {0}")]
    Database(#[from] aarogya_database::DatabaseError),

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Client could not be constructed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// True when the remote rejected the bearer token.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Remote { status: 401 | 403, .. } | Self::Auth(_))
    }
}

/// Convenience Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_display() {
        let err = SyncError::Remote {
            status: 401,
            message: "JWT expired".to_string(),
        };
        assert_eq!(err.to_string(), "Remote error: 401 - JWT expired");
        assert!(err.is_auth_rejection());
    }

    #[test]
    fn server_error_is_not_auth_rejection() {
        let err = SyncError::Remote {
            status: 500,
            message: "internal".to_string(),
        };
        assert!(!err.is_auth_rejection());
    }

    #[test]
    fn json_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{{{").unwrap_err();
        let err: SyncError = serde_err.into();
        assert!(err.to_string().starts_with("JSON error:"));
    }
}
