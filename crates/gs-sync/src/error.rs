//! Error types for gs-sync

use thiserror::Error;

/// Errors that can occur while talking to remote storage
#[derive(Error, Debug)]
pub enum StorageError {
    /// Not a `gs://bucket[/prefix]` URL
    #[error("Invalid storage URL: {0}")]
    InvalidUrl(String),

    /// gsutil not found
    #[error("gsutil is not installed or not in PATH")]
    GsutilNotFound,

    /// gsutil exited non-zero
    #[error("gsutil command failed: {0}")]
    GsutilCommandFailed(String),

    /// Remote object name would land outside the local directory
    #[error("Refusing to sync object outside the target directory: {0}")]
    InvalidObjectPath(String),

    /// Listing output could not be understood
    #[error("Failed to parse storage listing: {0}")]
    Parse(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error (for the JSON API)
    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Http(err.to_string())
    }
}

impl From<tempfile::PersistError> for StorageError {
    fn from(err: tempfile::PersistError) -> Self {
        StorageError::Io(err.error)
    }
}
