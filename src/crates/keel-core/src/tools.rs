//! Tool schemas, calls, results, and the dispatcher interface
//!
//! Tools are opaque to the runtime: a [`ToolSchema`] advertises a name,
//! description and JSON-schema parameters; a [`ToolCall`] is the model's
//! structured request to invoke one; a [`ToolResult`] is the dispatcher's
//! structured answer. The runtime never interprets tool semantics - execution
//! lives behind the [`ToolDispatcher`] trait.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Definition of a tool the model may call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool name
    pub name: String,

    /// Human-readable description the model uses to decide when to call
    pub description: String,

    /// JSON Schema describing the tool's parameters
    #[serde(default)]
    pub parameters: Value,
}

impl ToolSchema {
    /// Create a new tool schema.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Value::Null,
        }
    }

    /// Set the parameter schema.
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }
}

/// A structured request from the model to invoke a named tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned call id, echoed back in the matching result
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Raw JSON arguments
    pub arguments: Value,
}

impl ToolCall {
    /// Create a new tool call.
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// The outcome of executing a single tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Id of the call this result answers
    pub tool_call_id: String,

    /// Name of the executed tool
    pub name: String,

    /// Result payload on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error text on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Wall-clock execution time
    #[serde(default)]
    pub duration: Duration,
}

impl ToolResult {
    /// Create a successful result.
    pub fn success(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        result: Value,
        duration: Duration,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            result: Some(result),
            error: None,
            duration,
        }
    }

    /// Create a failed result.
    pub fn failure(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        error: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            result: None,
            error: Some(error.into()),
            duration,
        }
    }

    /// Whether this result carries an error.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Interface to the external tool execution layer
///
/// Implementations own tool bodies, whitelisting and argument validation.
/// Per-tool failures are reported inside the returned [`ToolResult`]s, not as
/// a dispatch error; a dispatch error means no results were produced at all.
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    /// Tools the given agent is allowed to call.
    async fn get_allowed_tools(&self, agent_id: &str) -> Result<Vec<ToolSchema>>;

    /// Execute the given calls on behalf of the agent.
    ///
    /// Returns one result per call. Order is not guaranteed to match the
    /// input; callers that care about ordering should match on
    /// `tool_call_id`.
    async fn execute_for_agent(
        &self,
        agent_id: &str,
        calls: Vec<ToolCall>,
    ) -> Result<Vec<ToolResult>>;
}
