//! Error types for buildstep-core

use thiserror::Error;

/// Errors that can fail a build step
#[derive(Error, Debug)]
pub enum StepError {
    /// Step configuration was missing or malformed
    #[error("Invalid step configuration: {0}")]
    InvalidConfig(String),

    /// External command could not be found
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    /// External command exited non-zero
    #[error("Command `{command}` failed with exit code {exit_code}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// External command ran past its timeout and was killed
    #[error("Command `{command}` timed out after {timeout_secs} seconds")]
    CommandTimedOut { command: String, timeout_secs: u64 },

    /// Remote storage transfer failed
    #[error(transparent)]
    Storage(#[from] gs_sync::StorageError),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Step lifecycle misuse
    #[error("Invalid step transition: {0}")]
    InvalidTransition(String),
}

/// Result type for step operations
pub type Result<T> = std::result::Result<T, StepError>;
