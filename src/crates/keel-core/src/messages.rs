//! Conversation message types
//!
//! Messages are the unit of conversation history threaded through the ReAct
//! loop and persisted in checkpoints. The core treats content as opaque text;
//! tool-call stubs ride on assistant messages and tool results are tied back
//! via `tool_call_id`.

use crate::tools::{ToolCall, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions and constraints
    System,
    /// End-user input
    User,
    /// LLM output, possibly carrying tool-call stubs
    Assistant,
    /// Tool execution result, keyed by `tool_call_id`
    Tool,
}

/// A single conversation message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,

    /// Message content
    pub content: String,

    /// Tool calls requested by the model (assistant messages only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,

    /// Tool call this message answers (tool messages only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Additional metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Message {
    /// Create a new message with the given role and content.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
            metadata: None,
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Create a tool-role message answering the given tool call.
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut message = Self::new(MessageRole::Tool, content);
        message.tool_call_id = Some(tool_call_id.into());
        message
    }

    /// Create a tool-role message from a gathered tool result.
    ///
    /// Successful results serialize their payload; failed results carry the
    /// error text so the model can see and react to it.
    pub fn from_tool_result(result: &ToolResult) -> Self {
        let content = match (&result.result, &result.error) {
            (_, Some(error)) => error.clone(),
            (Some(value), None) => value.to_string(),
            (None, None) => String::new(),
        };
        Self::tool(result.tool_call_id.clone(), content)
    }

    /// Attach tool calls to this message.
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = Some(tool_calls);
        self
    }

    /// Whether this message carries at least one tool call.
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls
            .as_ref()
            .map(|calls| !calls.is_empty())
            .unwrap_or(false)
    }

    /// Whether this is an assistant message.
    pub fn is_assistant(&self) -> bool {
        self.role == MessageRole::Assistant
    }

    /// Whether this is a tool-role message.
    pub fn is_tool(&self) -> bool {
        self.role == MessageRole::Tool
    }
}
