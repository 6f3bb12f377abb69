//! Error types for ctask
//!
//! Every failure the start sequence can surface lives here so the CLI can
//! report one error type.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// ctask error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Preconditions
    // ========================================================================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    // ========================================================================
    // Runtime backend
    // ========================================================================
    /// The container has no running task to attach to
    #[error("No running task for container: {0}")]
    TaskNotFound(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Failed to create task: {0}")]
    TaskCreate(String),

    #[error("Failed to start task: {0}")]
    TaskStart(String),

    #[error("Wait error: {0}")]
    Wait(String),

    // ========================================================================
    // Host
    // ========================================================================
    #[error("Console error: {0}")]
    Console(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // External conversions
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the backend reported that no task exists yet
    pub fn is_task_not_found(&self) -> bool {
        matches!(self, Error::TaskNotFound(_))
    }

    /// Errors whose message is meant for the person at the terminal
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_)
                | Error::ContainerNotFound(_)
                | Error::TaskStart(_)
                | Error::Config(_)
        )
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Error::Runtime(message.into())
    }

    pub fn console(message: impl Into<String>) -> Self {
        Error::Console(message.into())
    }
}
