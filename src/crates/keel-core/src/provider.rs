//! Provider-agnostic LLM interface consumed by the runtime
//!
//! The runtime is an orchestration layer, not an LLM client library: concrete
//! HTTP transports live outside the core and plug in through the
//! [`ModelProvider`] trait. The core only needs three things from a provider:
//! a blocking completion call, a streaming call returning a channel of
//! [`StreamChunk`]s, and a capability flag for native function calling.

use crate::error::Result;
use crate::messages::{Message, MessageRole};
use crate::tools::{ToolCall, ToolSchema};
use async_trait::async_trait;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;

/// How the model is allowed to use tools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// Model decides whether to call tools
    Auto,
    /// Model must not call tools
    None,
    /// Model must call at least one tool
    Required,
    /// Model must call the named tool
    Tool(String),
}

/// Generation parameters for a chat request
#[derive(Debug, Clone, Default)]
pub struct ChatConfig {
    /// Model identifier, provider-interpreted
    pub model: Option<String>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    pub max_tokens: Option<usize>,

    /// Nucleus sampling parameter
    pub top_p: Option<f32>,

    /// Sequences that halt generation
    pub stop_sequences: Vec<String>,

    /// Tool usage policy
    pub tool_choice: Option<ToolChoice>,

    /// Tools the model may call
    pub tools: Vec<ToolSchema>,

    /// Per-request deadline
    pub timeout: Option<Duration>,

    /// Opaque request metadata
    pub metadata: HashMap<String, Value>,
}

/// A request to a chat model: messages plus configuration
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// The conversation to send
    pub messages: Vec<Message>,

    /// Generation parameters
    pub config: ChatConfig,
}

impl ChatRequest {
    /// Create a request with the given messages and default configuration.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            config: ChatConfig::default(),
        }
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    /// Set the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.max_tokens = Some(max_tokens);
        self
    }

    /// Set top-p (nucleus) sampling.
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.config.top_p = Some(top_p);
        self
    }

    /// Set stop sequences.
    pub fn with_stop_sequences(mut self, sequences: Vec<String>) -> Self {
        self.config.stop_sequences = sequences;
        self
    }

    /// Set the tool usage policy.
    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.config.tool_choice = Some(choice);
        self
    }

    /// Bind tools the model may call.
    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.config.tools = tools;
        self
    }

    /// Set a per-request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }
}

/// Why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Model produced a natural end of turn
    Stop,
    /// Token limit reached
    Length,
    /// Model requested tool calls
    ToolCalls,
    /// ReAct iteration budget exhausted
    MaxIterations,
}

/// Token accounting reported by a provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetadata {
    /// Tokens consumed by the prompt
    pub input_tokens: usize,
    /// Tokens generated
    pub output_tokens: usize,
    /// Total tokens
    pub total_tokens: usize,
}

/// A complete response from a chat model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The assistant's message, possibly carrying tool-call stubs
    pub message: Message,

    /// Why generation stopped
    pub finish_reason: FinishReason,

    /// Token usage, when reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageMetadata>,

    /// Model that produced the response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ChatResponse {
    /// Create a plain assistant response.
    pub fn new(message: Message, finish_reason: FinishReason) -> Self {
        Self {
            message,
            finish_reason,
            usage: None,
            model: None,
        }
    }

    /// Whether the response requests tool calls.
    pub fn has_tool_calls(&self) -> bool {
        self.message.has_tool_calls()
    }
}

/// Incremental piece of a streamed response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// Role, present on the first chunk of a turn
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<MessageRole>,

    /// Content fragment
    #[serde(default)]
    pub content: String,

    /// Tool calls parsed so far, attached once complete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

/// One element of a provider's streaming response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Provider-assigned response id
    pub id: String,

    /// Provider name
    pub provider: String,

    /// Model that produced the chunk
    pub model: String,

    /// Incremental payload
    pub delta: ChunkDelta,

    /// Set on the final chunk of the turn
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,

    /// Usage, typically on the final chunk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageMetadata>,

    /// Stream-level error; terminates the current streamed call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Stream of chunks from a provider
pub type ChunkStream = Pin<Box<dyn Stream<Item = StreamChunk> + Send>>;

/// Interface to an LLM provider
///
/// Implementations must be `Send + Sync`; share them as
/// `Arc<dyn ModelProvider>`.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name, for logs and events.
    fn name(&self) -> &str;

    /// Whether the provider supports native function calling.
    ///
    /// The ReAct executor refuses tool-bearing requests on providers that
    /// return `false` here.
    fn supports_native_function_calling(&self) -> bool {
        false
    }

    /// Generate a complete response.
    async fn completion(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Stream a response chunk by chunk.
    ///
    /// Errors after the stream starts are carried in
    /// [`StreamChunk::error`] and terminate only the current call.
    async fn stream(&self, request: ChatRequest) -> Result<ChunkStream>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let request = ChatRequest::new(vec![Message::user("hi")])
            .with_model("small-1")
            .with_temperature(0.2)
            .with_max_tokens(256)
            .with_stop_sequences(vec!["\n\n".to_string()])
            .with_tools(vec![ToolSchema::new("search", "Search the web")])
            .with_tool_choice(ToolChoice::Auto)
            .with_timeout(Duration::from_secs(30));

        assert_eq!(request.config.model.as_deref(), Some("small-1"));
        assert_eq!(request.config.temperature, Some(0.2));
        assert_eq!(request.config.tools.len(), 1);
        assert_eq!(request.config.tool_choice, Some(ToolChoice::Auto));
    }

    #[test]
    fn test_response_tool_call_detection() {
        let plain = ChatResponse::new(Message::assistant("done"), FinishReason::Stop);
        assert!(!plain.has_tool_calls());

        let with_calls = ChatResponse::new(
            Message::assistant("").with_tool_calls(vec![ToolCall::new(
                "c1",
                "search",
                json!({"q": "keel"}),
            )]),
            FinishReason::ToolCalls,
        );
        assert!(with_calls.has_tool_calls());
    }

    #[test]
    fn test_chunk_serde_round_trip() {
        let chunk = StreamChunk {
            id: "r1".to_string(),
            provider: "mock".to_string(),
            model: "small-1".to_string(),
            delta: ChunkDelta {
                role: Some(MessageRole::Assistant),
                content: "hel".to_string(),
                tool_calls: None,
            },
            finish_reason: None,
            usage: None,
            error: None,
        };
        let json = serde_json::to_string(&chunk).unwrap();
        let back: StreamChunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back.delta.content, "hel");
        assert!(back.finish_reason.is_none());
    }
}
