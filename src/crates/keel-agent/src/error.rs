//! Error types for agent runtime operations

use keel_checkpoint::CheckpointError;
use keel_core::CoreError;
use thiserror::Error;

/// Result type for agent runtime operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors that can occur while driving an agent
#[derive(Error, Debug)]
pub enum AgentError {
    /// Invalid agent configuration; fatal at construction
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Error from the core runtime (transitions, providers, dispatch)
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Error from the checkpoint store
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// Request carries tools but the effective provider cannot call them
    #[error("provider '{provider}' does not support native function calling")]
    ToolsUnsupported {
        /// Name of the offending provider
        provider: String,
    },

    /// Lifecycle operation requires a running agent
    #[error("agent is not running")]
    NotRunning,

    /// Lifecycle operation requires a stopped agent
    #[error("agent is already running")]
    AlreadyRunning,

    /// Per-request deadline elapsed
    #[error("operation timed out")]
    Timeout,

    /// Invocation was cancelled
    #[error("operation cancelled")]
    Cancelled,

    /// Plan step execution failed
    #[error("execution failed: {0}")]
    Execution(String),
}

impl AgentError {
    /// Whether retrying the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AgentError::Core(core) => core.is_retryable(),
            AgentError::Timeout => true,
            _ => false,
        }
    }
}
