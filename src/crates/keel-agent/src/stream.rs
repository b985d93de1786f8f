//! Consumer-facing stream fan-out
//!
//! [`Agent::chat_stream`](crate::agent::Agent::chat_stream) normalizes the
//! ReAct executor's event stream into a single ordered channel of
//! [`AgentStreamEvent`]s for the caller, while mirroring the same activity
//! onto the event bus for observers.
//!
//! Invariants: every `tool_call` for a given id is followed by exactly one
//! `tool_result` for the same id (success or error); `token` events carry
//! both the full `token` and the incremental `delta`, identical by
//! construction; the channel closes exactly once.

use crate::react::ReactEvent;
use keel_core::{ToolCall, ToolResult};
use std::time::Duration;

/// How long a stream event may wait for the consumer before the run is
/// abandoned
pub const STREAM_HANDOFF_TIMEOUT: Duration = Duration::from_secs(300);

/// Event delivered to a streaming chat consumer
#[derive(Debug, Clone)]
pub enum AgentStreamEvent {
    /// A generated token
    Token {
        /// Full token text
        token: String,
        /// Incremental delta, identical to `token`
        delta: String,
    },
    /// A tool call was dispatched
    ToolCall {
        /// The dispatched call
        call: ToolCall,
    },
    /// A tool call completed
    ToolResult {
        /// The gathered result
        result: ToolResult,
    },
}

/// Translate one executor event into zero or more consumer events.
///
/// Terminal executor events translate to nothing: completion and failure are
/// signalled to the caller by closing the channel (and to observers through
/// the event bus).
pub(crate) fn translate(event: ReactEvent) -> Vec<AgentStreamEvent> {
    match event {
        ReactEvent::LlmChunk { delta } => vec![AgentStreamEvent::Token {
            token: delta.clone(),
            delta,
        }],
        ReactEvent::ToolsStart { tool_calls } => tool_calls
            .into_iter()
            .map(|call| AgentStreamEvent::ToolCall { call })
            .collect(),
        ReactEvent::ToolsEnd { tool_results } => tool_results
            .into_iter()
            .map(|result| AgentStreamEvent::ToolResult { result })
            .collect(),
        ReactEvent::Completed { .. } | ReactEvent::Error { .. } => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::{ChatResponse, FinishReason, Message};
    use serde_json::json;

    #[test]
    fn test_token_carries_identical_delta() {
        let events = translate(ReactEvent::LlmChunk {
            delta: "hi".to_string(),
        });
        match &events[..] {
            [AgentStreamEvent::Token { token, delta }] => {
                assert_eq!(token, "hi");
                assert_eq!(token, delta);
            }
            other => panic!("unexpected translation: {other:?}"),
        }
    }

    #[test]
    fn test_tool_batches_fan_out_per_call() {
        let calls = vec![
            ToolCall::new("c1", "echo", json!({})),
            ToolCall::new("c2", "echo", json!({})),
        ];
        let events = translate(ReactEvent::ToolsStart { tool_calls: calls });
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|e| matches!(e, AgentStreamEvent::ToolCall { .. })));
    }

    #[test]
    fn test_terminal_events_translate_to_nothing() {
        let completed = ReactEvent::Completed {
            response: ChatResponse::new(Message::assistant("done"), FinishReason::Stop),
        };
        assert!(translate(completed).is_empty());
        assert!(translate(ReactEvent::Error {
            message: "boom".to_string()
        })
        .is_empty());
    }
}
