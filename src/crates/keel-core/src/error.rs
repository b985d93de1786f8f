//! Error types for core runtime operations

use crate::state::AgentState;
use thiserror::Error;

/// Result type for core runtime operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in the core runtime
#[derive(Error, Debug)]
pub enum CoreError {
    /// Requested state transition is not in the legal transition table
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// State the agent was in when the transition was requested
        from: AgentState,
        /// State the transition targeted
        to: AgentState,
    },

    /// LLM provider call failed
    #[error("provider error: {message}")]
    Provider {
        /// Provider-supplied failure description
        message: String,
        /// Whether the provider considers the failure transient
        retryable: bool,
    },

    /// Tool dispatch failed before any tool result was produced
    #[error("tool dispatch failed: {0}")]
    Tool(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl CoreError {
    /// Create a provider error.
    pub fn provider(message: impl Into<String>, retryable: bool) -> Self {
        CoreError::Provider {
            message: message.into(),
            retryable,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Provider { retryable: true, .. })
    }
}
