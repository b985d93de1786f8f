//! Typed events carried by the event bus
//!
//! Every emitted event is a value-typed, serializable record carrying at
//! least `{timestamp, agent_id, type}`. The runtime uses one canonical set of
//! event types: lifecycle/observability events (`state_change`, `tool_call`,
//! `execute`, `complete`, `error`, `feedback`) and runtime-stream events
//! (`token`, `tool_call_dispatched`, `tool_result`). Handlers must not assume
//! identity beyond the carried fields - events are cloned per subscriber and
//! not retained after delivery.

use crate::state::AgentState;
use crate::tools::{ToolCall, ToolResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Stage of a tool call observability event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallStage {
    /// Emitted before the tool is dispatched
    Start,
    /// Emitted after the tool result is gathered
    End,
}

/// Discriminant for event subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A state machine transition was applied
    StateChange,
    /// A tool call began or ended
    ToolCall,
    /// A plan step began executing
    Execute,
    /// A unit of work finished
    Complete,
    /// An error surfaced
    Error,
    /// External feedback was recorded
    Feedback,
    /// A streamed token was produced
    Token,
    /// A batch of tool calls was dispatched
    ToolCallDispatched,
    /// A batch of tool results was gathered
    ToolResult,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::StateChange => "state_change",
            EventType::ToolCall => "tool_call",
            EventType::Execute => "execute",
            EventType::Complete => "complete",
            EventType::Error => "error",
            EventType::Feedback => "feedback",
            EventType::Token => "token",
            EventType::ToolCallDispatched => "tool_call_dispatched",
            EventType::ToolResult => "tool_result",
        };
        write!(f, "{}", name)
    }
}

/// Payload of an [`AgentEvent`], tagged by event type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A state machine transition was applied
    StateChange {
        /// State before the transition
        from: AgentState,
        /// State after the transition
        to: AgentState,
    },
    /// A tool call began or ended
    ToolCall {
        /// Whether the call is starting or has finished
        stage: ToolCallStage,
        /// The call in question
        call: ToolCall,
    },
    /// A plan step began executing
    Execute {
        /// Workflow the step belongs to
        workflow_id: String,
        /// Name of the step
        node: String,
    },
    /// A unit of work finished
    Complete {
        /// Opaque result payload
        result: Value,
    },
    /// An error surfaced
    Error {
        /// Error description
        message: String,
    },
    /// External feedback was recorded
    Feedback {
        /// Opaque feedback payload
        content: Value,
    },
    /// A streamed token was produced
    Token {
        /// Full token text
        token: String,
        /// Incremental delta (identical to `token` by construction)
        delta: String,
    },
    /// A batch of tool calls was dispatched
    ToolCallDispatched {
        /// The dispatched calls
        calls: Vec<ToolCall>,
    },
    /// A batch of tool results was gathered
    ToolResult {
        /// The gathered results
        results: Vec<ToolResult>,
    },
}

impl EventPayload {
    /// Event type of this payload.
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::StateChange { .. } => EventType::StateChange,
            EventPayload::ToolCall { .. } => EventType::ToolCall,
            EventPayload::Execute { .. } => EventType::Execute,
            EventPayload::Complete { .. } => EventType::Complete,
            EventPayload::Error { .. } => EventType::Error,
            EventPayload::Feedback { .. } => EventType::Feedback,
            EventPayload::Token { .. } => EventType::Token,
            EventPayload::ToolCallDispatched { .. } => EventType::ToolCallDispatched,
            EventPayload::ToolResult { .. } => EventType::ToolResult,
        }
    }
}

/// A typed event emitted by the runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEvent {
    /// Id of the originating agent
    pub agent_id: String,

    /// When the event was created
    pub timestamp: DateTime<Utc>,

    /// Typed payload
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl AgentEvent {
    /// Create an event stamped with the current time.
    pub fn new(agent_id: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            agent_id: agent_id.into(),
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Event type of this event.
    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }
}
