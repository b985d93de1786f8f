//! Error types for checkpoint operations

use thiserror::Error;

/// Result type for checkpoint operations
pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Errors that can occur during checkpoint operations
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// Checkpoint, version or thread not found.
    ///
    /// Expected in normal operation (e.g. resuming a thread that never
    /// saved); every other variant is a genuine failure.
    #[error("checkpoint not found: {0}")]
    NotFound(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Version index on disk does not parse or is inconsistent
    #[error("corrupt version index: {0}")]
    CorruptIndex(String),

    /// Storage error
    #[error("storage error: {0}")]
    Storage(String),
}

impl CheckpointError {
    /// Whether this error is the expected not-found case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CheckpointError::NotFound(_))
    }
}
