//! Subscription error types.

use crate::NotificationPermission;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// Subscribing requires granted permission.
    #[error("Notification permission is {0}")]
    PermissionNotGranted(NotificationPermission),

    /// The platform push service failed or returned unusable data.
    #[error("Push registrar error: {0}")]
    Registrar(String),

    /// Endpoint is not an absolute https URL.
    #[error("Invalid push endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Database error: {0}")]
    Database(#[from] aarogya_database::DatabaseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SubscriptionResult<T> = Result<T, SubscriptionError>;
