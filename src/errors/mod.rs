use thiserror::Error;

pub mod provider;

pub use provider::{AuthenticationError, StorageError};

/// Common trait for all custom error types surfaced to callers
pub trait AppError: std::error::Error + Send + Sync + 'static {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get the error code for frontend handling
    fn error_code(&self) -> &'static str;

    /// Whether offering the user a manual retry makes sense
    fn is_retryable(&self) -> bool {
        false
    }
}

/// Error recorded by the sync service after a failed operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AppError for SyncError {
    fn user_message(&self) -> String {
        match self {
            SyncError::Authentication(e) => e.user_message(),
            SyncError::Storage(e) => e.user_message(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            SyncError::Authentication(e) => e.error_code(),
            SyncError::Storage(e) => e.error_code(),
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            SyncError::Authentication(e) => e.is_retryable(),
            SyncError::Storage(e) => e.is_retryable(),
        }
    }
}
