use thiserror::Error;

use super::AppError;

/// Failures while establishing a provider session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    #[error("Invalid or missing credentials")]
    InvalidCredentials,

    #[error("Network error while authenticating")]
    NetworkError,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Unknown authentication error")]
    UnknownError,
}

/// Failures of listing and download operations on an authenticated provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Provider is not authenticated")]
    NotAuthenticated,

    #[error("Network error while talking to storage")]
    NetworkError,

    #[error("Resource not found")]
    NotFound,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Invalid response from storage server")]
    InvalidResponse,

    #[error("Unknown storage error")]
    UnknownError,
}

impl AppError for AuthenticationError {
    fn user_message(&self) -> String {
        match self {
            AuthenticationError::InvalidCredentials => "Authentication failed - please check credentials".to_string(),
            AuthenticationError::NetworkError => "Unable to reach the server".to_string(),
            AuthenticationError::ServerError(detail) => format!("Server rejected the login: {}", detail),
            AuthenticationError::UnknownError => "Authentication failed for an unknown reason".to_string(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AuthenticationError::InvalidCredentials => "AUTH_INVALID_CREDENTIALS",
            AuthenticationError::NetworkError => "AUTH_NETWORK_ERROR",
            AuthenticationError::ServerError(_) => "AUTH_SERVER_ERROR",
            AuthenticationError::UnknownError => "AUTH_UNKNOWN_ERROR",
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            AuthenticationError::NetworkError | AuthenticationError::ServerError(_)
        )
    }
}

impl AppError for StorageError {
    fn user_message(&self) -> String {
        match self {
            StorageError::NotAuthenticated => "Connect to a storage provider first".to_string(),
            StorageError::NetworkError => "Unable to reach the storage server".to_string(),
            StorageError::NotFound => "Photo not found".to_string(),
            StorageError::ServerError(detail) => format!("Storage server error: {}", detail),
            StorageError::InvalidResponse => "The storage server sent an unreadable response".to_string(),
            StorageError::UnknownError => "An unknown storage error occurred".to_string(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            StorageError::NotAuthenticated => "STORAGE_NOT_AUTHENTICATED",
            StorageError::NetworkError => "STORAGE_NETWORK_ERROR",
            StorageError::NotFound => "STORAGE_NOT_FOUND",
            StorageError::ServerError(_) => "STORAGE_SERVER_ERROR",
            StorageError::InvalidResponse => "STORAGE_INVALID_RESPONSE",
            StorageError::UnknownError => "STORAGE_UNKNOWN_ERROR",
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageError::NetworkError | StorageError::ServerError(_)
        )
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StorageError::InvalidResponse
        } else {
            StorageError::NetworkError
        }
    }
}

impl From<reqwest::Error> for AuthenticationError {
    fn from(_: reqwest::Error) -> Self {
        AuthenticationError::NetworkError
    }
}
