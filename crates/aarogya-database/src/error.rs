//! Local store error types.

use thiserror::Error;

/// Error type for every local persistence failure.
///
/// Callers treat any of these as "could not save locally": the store is the
/// device's own storage, so there is nothing to retry against.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Executor thread or connection failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record rejected at the storage boundary
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl DatabaseError {
    /// True when the device storage itself is full or unusable.
    pub fn is_storage_exhausted(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DiskFull
                    | rusqlite::ErrorCode::ReadOnly
                    | rusqlite::ErrorCode::CannotOpen
                    | rusqlite::ErrorCode::SystemIoFailure
            ),
            Self::Io(_) | Self::Connection(_) => true,
            _ => false,
        }
    }
}

/// Result type alias using DatabaseError.
pub type DatabaseResult<T> = Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_data_display() {
        let err = DatabaseError::InvalidData("dose event id is empty".to_string());
        assert_eq!(err.to_string(), "Invalid data: dose event id is empty");
        assert!(!err.is_storage_exhausted());
    }

    #[test]
    fn disk_full_is_storage_exhausted() {
        let err = DatabaseError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
            None,
        ));
        assert!(err.is_storage_exhausted());
    }
}
