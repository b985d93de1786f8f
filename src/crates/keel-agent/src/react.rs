//! ReAct tool-call loop
//!
//! The ReAct (Reasoning + Acting) loop drives an agent that may call tools:
//! invoke the LLM, dispatch any requested tool calls, feed the results back,
//! and repeat until the model answers without tools or the iteration budget
//! runs out.
//!
//! Two forms share one loop body:
//!
//! - **Blocking** - [`ReactExecutor::run`] returns the final
//!   [`ChatResponse`] together with the accumulated message list.
//! - **Streaming** - [`ReactExecutor::run_stream`] emits typed
//!   [`ReactEvent`]s on a channel: `llm_chunk` per token, `tools_start` /
//!   `tools_end` around each dispatch round, then a terminal `completed` or
//!   `error`. The channel closes after the terminal event.
//!
//! # Provider duality
//!
//! When a `tool_provider` is configured it is preferred for the loop - tool
//! iterations tolerate a cheaper model than final answers. Both references
//! share the [`ModelProvider`] interface.
//!
//! # Ordering
//!
//! All tool calls of one assistant turn are dispatched concurrently; their
//! results are appended to the conversation in tool-call order, regardless
//! of completion order. Stream events of one request are emitted strictly
//! in order by a single task.
//!
//! # Cancellation
//!
//! Cancellation is cooperative: the loop exits at the next iteration
//! boundary, draining (and discarding) any in-flight LLM or tool call.
//! A cancelled stream emits no further events; the channel still closes.

use crate::error::{AgentError, Result};
use futures::future::join_all;
use futures::StreamExt;
use keel_core::{
    ChatRequest, ChatResponse, FinishReason, Message, ModelProvider, ToolCall, ToolDispatcher,
    ToolResult,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Capacity of the streaming event channel
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Configuration of the ReAct loop
#[derive(Debug, Clone)]
pub struct ReactConfig {
    /// Maximum number of LLM iterations
    pub max_iterations: usize,

    /// Break out of the loop on the first failed tool result
    pub stop_on_error: bool,
}

impl Default for ReactConfig {
    fn default() -> Self {
        Self {
            max_iterations: crate::config::DEFAULT_MAX_REACT_ITERATIONS,
            stop_on_error: false,
        }
    }
}

/// Typed event emitted by the streaming form of the loop
#[derive(Debug, Clone)]
pub enum ReactEvent {
    /// A partial token from the current LLM turn
    LlmChunk {
        /// Content fragment
        delta: String,
    },
    /// All tool calls for the current turn are parsed
    ToolsStart {
        /// Calls about to be dispatched
        tool_calls: Vec<ToolCall>,
    },
    /// All tool calls of the current turn completed
    ToolsEnd {
        /// Gathered results, in tool-call order
        tool_results: Vec<ToolResult>,
    },
    /// Terminal: the loop produced a final response
    Completed {
        /// The final response
        response: ChatResponse,
    },
    /// Terminal: the loop failed
    Error {
        /// Failure description
        message: String,
    },
}

/// Result of the blocking form of the loop
#[derive(Debug, Clone)]
pub struct ReactOutcome {
    /// Final response
    pub response: ChatResponse,

    /// Full conversation including assistant turns and tool results
    pub messages: Vec<Message>,

    /// Number of LLM iterations performed
    pub iterations: usize,

    /// Number of tool calls dispatched
    pub tool_dispatches: usize,
}

/// Multi-iteration LLM <-> tool loop executor
#[derive(Clone)]
pub struct ReactExecutor {
    provider: Arc<dyn ModelProvider>,
    tool_provider: Option<Arc<dyn ModelProvider>>,
    dispatcher: Arc<dyn ToolDispatcher>,
    config: ReactConfig,
}

impl ReactExecutor {
    /// Create an executor over the given provider and dispatcher.
    pub fn new(provider: Arc<dyn ModelProvider>, dispatcher: Arc<dyn ToolDispatcher>) -> Self {
        Self {
            provider,
            tool_provider: None,
            dispatcher,
            config: ReactConfig::default(),
        }
    }

    /// Prefer a cheaper provider for tool-call iterations.
    pub fn with_tool_provider(mut self, provider: Arc<dyn ModelProvider>) -> Self {
        self.tool_provider = Some(provider);
        self
    }

    /// Set the loop configuration.
    pub fn with_config(mut self, config: ReactConfig) -> Self {
        self.config = config;
        self
    }

    fn effective_provider(&self) -> &Arc<dyn ModelProvider> {
        self.tool_provider.as_ref().unwrap_or(&self.provider)
    }

    fn check_tool_support(&self, request: &ChatRequest) -> Result<()> {
        if request.config.tools.is_empty() {
            return Ok(());
        }
        let provider = self.effective_provider();
        if !provider.supports_native_function_calling() {
            return Err(AgentError::ToolsUnsupported {
                provider: provider.name().to_string(),
            });
        }
        Ok(())
    }

    /// Dispatch all tool calls of one assistant turn concurrently.
    ///
    /// Results come back in tool-call order. Per-call failures (including
    /// dispatcher errors) are packaged into the matching [`ToolResult`] so
    /// the model can see and react to them.
    async fn dispatch(&self, agent_id: &str, calls: &[ToolCall]) -> Vec<ToolResult> {
        let futures = calls.iter().map(|call| {
            let dispatcher = Arc::clone(&self.dispatcher);
            let call = call.clone();
            let agent_id = agent_id.to_string();
            async move {
                match dispatcher.execute_for_agent(&agent_id, vec![call.clone()]).await {
                    Ok(mut results) if !results.is_empty() => results.remove(0),
                    Ok(_) => ToolResult::failure(
                        call.id.clone(),
                        call.name.clone(),
                        "dispatcher returned no result",
                        Duration::default(),
                    ),
                    Err(e) => ToolResult::failure(
                        call.id.clone(),
                        call.name.clone(),
                        e.to_string(),
                        Duration::default(),
                    ),
                }
            }
        });
        join_all(futures).await
    }

    /// Run the blocking form of the loop.
    pub async fn run(
        &self,
        agent_id: &str,
        request: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ReactOutcome> {
        self.check_tool_support(&request)?;
        let provider = self.effective_provider();

        let mut messages = request.messages.clone();
        let mut iterations = 0;
        let mut tool_dispatches = 0;
        let mut last_response: Option<ChatResponse> = None;

        while iterations < self.config.max_iterations {
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            iterations += 1;

            let iteration_request = ChatRequest {
                messages: messages.clone(),
                config: request.config.clone(),
            };
            let response = provider.completion(iteration_request).await?;
            tracing::debug!(
                agent_id,
                iteration = iterations,
                has_tool_calls = response.has_tool_calls(),
                "LLM iteration complete"
            );

            let calls = response
                .message
                .tool_calls
                .clone()
                .filter(|calls| !calls.is_empty());
            messages.push(response.message.clone());

            let Some(calls) = calls else {
                return Ok(ReactOutcome {
                    response,
                    messages,
                    iterations,
                    tool_dispatches,
                });
            };

            let results = self.dispatch(agent_id, &calls).await;
            tool_dispatches += calls.len();
            let errored = results.iter().any(ToolResult::is_error);
            for result in &results {
                messages.push(Message::from_tool_result(result));
            }

            if self.config.stop_on_error && errored {
                tracing::debug!(agent_id, "tool result carried an error, stopping loop");
                return Ok(ReactOutcome {
                    response,
                    messages,
                    iterations,
                    tool_dispatches,
                });
            }
            last_response = Some(response);
        }

        let mut response = last_response.ok_or_else(|| {
            AgentError::Execution("ReAct loop produced no response".to_string())
        })?;
        response.finish_reason = FinishReason::MaxIterations;
        Ok(ReactOutcome {
            response,
            messages,
            iterations,
            tool_dispatches,
        })
    }

    /// Run the streaming form of the loop.
    ///
    /// The returned channel yields [`ReactEvent`]s and closes after the
    /// terminal `completed` or `error` event - or without one when the
    /// request is cancelled.
    pub fn run_stream(
        &self,
        agent_id: &str,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<ReactEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let executor = self.clone();
        let agent_id = agent_id.to_string();
        tokio::spawn(async move {
            executor.stream_loop(agent_id, request, cancel, tx).await;
        });
        rx
    }

    async fn stream_loop(
        self,
        agent_id: String,
        request: ChatRequest,
        cancel: CancellationToken,
        tx: mpsc::Sender<ReactEvent>,
    ) {
        if let Err(e) = self.check_tool_support(&request) {
            let _ = tx
                .send(ReactEvent::Error {
                    message: e.to_string(),
                })
                .await;
            return;
        }
        let provider = Arc::clone(self.effective_provider());
        let mut messages = request.messages.clone();

        for iteration in 1..=self.config.max_iterations {
            if cancel.is_cancelled() {
                return;
            }

            let iteration_request = ChatRequest {
                messages: messages.clone(),
                config: request.config.clone(),
            };
            let mut chunks = match provider.stream(iteration_request).await {
                Ok(chunks) => chunks,
                Err(e) => {
                    let _ = tx
                        .send(ReactEvent::Error {
                            message: e.to_string(),
                        })
                        .await;
                    return;
                }
            };

            let mut content = String::new();
            let mut tool_calls: Vec<ToolCall> = Vec::new();
            let mut finish_reason = None;
            let mut usage = None;
            let mut model = None;

            while let Some(chunk) = chunks.next().await {
                if let Some(message) = chunk.error {
                    let _ = tx.send(ReactEvent::Error { message }).await;
                    return;
                }
                if !chunk.delta.content.is_empty() {
                    content.push_str(&chunk.delta.content);
                    if tx
                        .send(ReactEvent::LlmChunk {
                            delta: chunk.delta.content,
                        })
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
                if let Some(calls) = chunk.delta.tool_calls {
                    tool_calls.extend(calls);
                }
                if chunk.finish_reason.is_some() {
                    finish_reason = chunk.finish_reason;
                }
                if chunk.usage.is_some() {
                    usage = chunk.usage;
                }
                model = Some(chunk.model);
            }

            // The in-flight call is drained above; a cancellation observed
            // here discards it without emitting a terminal event.
            if cancel.is_cancelled() {
                return;
            }

            if tool_calls.is_empty() {
                let response = ChatResponse {
                    message: Message::assistant(content),
                    finish_reason: finish_reason.unwrap_or(FinishReason::Stop),
                    usage,
                    model,
                };
                let _ = tx.send(ReactEvent::Completed { response }).await;
                return;
            }

            tracing::debug!(
                agent_id = %agent_id,
                iteration,
                calls = tool_calls.len(),
                "dispatching streamed tool calls"
            );
            messages.push(Message::assistant(content).with_tool_calls(tool_calls.clone()));
            if tx
                .send(ReactEvent::ToolsStart {
                    tool_calls: tool_calls.clone(),
                })
                .await
                .is_err()
            {
                return;
            }

            let results = self.dispatch(&agent_id, &tool_calls).await;
            let errored = results.iter().any(ToolResult::is_error);
            for result in &results {
                messages.push(Message::from_tool_result(result));
            }
            if tx
                .send(ReactEvent::ToolsEnd {
                    tool_results: results.clone(),
                })
                .await
                .is_err()
            {
                return;
            }

            if self.config.stop_on_error && errored {
                let message = results
                    .iter()
                    .find_map(|r| r.error.clone())
                    .unwrap_or_else(|| "tool execution failed".to_string());
                let _ = tx.send(ReactEvent::Error { message }).await;
                return;
            }
        }

        // Iteration budget exhausted: surface the last assistant turn.
        let message = messages
            .iter()
            .rev()
            .find(|m| m.is_assistant())
            .cloned()
            .unwrap_or_else(|| Message::assistant(""));
        let response = ChatResponse {
            message,
            finish_reason: FinishReason::MaxIterations,
            usage: None,
            model: None,
        };
        let _ = tx.send(ReactEvent::Completed { response }).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream;
    use keel_core::{ChunkDelta, ChunkStream, CoreError, StreamChunk, ToolSchema};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Provider that replays a fixed script of responses.
    struct ScriptedProvider {
        script: Mutex<VecDeque<ChatResponse>>,
        calls: AtomicUsize,
        supports_tools: bool,
    }

    impl ScriptedProvider {
        fn new(script: Vec<ChatResponse>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
                supports_tools: true,
            }
        }

        fn without_tool_support(mut self) -> Self {
            self.supports_tools = false;
            self
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn next_response(&self) -> keel_core::Result<ChatResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| CoreError::provider("script exhausted", false))
        }
    }

    #[async_trait]
    impl ModelProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn supports_native_function_calling(&self) -> bool {
            self.supports_tools
        }

        async fn completion(&self, _request: ChatRequest) -> keel_core::Result<ChatResponse> {
            self.next_response()
        }

        async fn stream(&self, _request: ChatRequest) -> keel_core::Result<ChunkStream> {
            let response = self.next_response()?;
            let mut chunks = Vec::new();
            for piece in response.message.content.split_inclusive(' ') {
                chunks.push(StreamChunk {
                    id: "r1".to_string(),
                    provider: "scripted".to_string(),
                    model: "small-1".to_string(),
                    delta: ChunkDelta {
                        role: None,
                        content: piece.to_string(),
                        tool_calls: None,
                    },
                    finish_reason: None,
                    usage: None,
                    error: None,
                });
            }
            chunks.push(StreamChunk {
                id: "r1".to_string(),
                provider: "scripted".to_string(),
                model: "small-1".to_string(),
                delta: ChunkDelta {
                    role: None,
                    content: String::new(),
                    tool_calls: response.message.tool_calls.clone(),
                },
                finish_reason: Some(response.finish_reason),
                usage: response.usage,
                error: None,
            });
            Ok(Box::pin(stream::iter(chunks)))
        }
    }

    /// Dispatcher that echoes arguments back and counts invocations.
    struct EchoDispatcher {
        dispatched: AtomicUsize,
        fail_tool: Option<String>,
    }

    impl EchoDispatcher {
        fn new() -> Self {
            Self {
                dispatched: AtomicUsize::new(0),
                fail_tool: None,
            }
        }

        fn failing_on(tool: &str) -> Self {
            Self {
                dispatched: AtomicUsize::new(0),
                fail_tool: Some(tool.to_string()),
            }
        }

        fn dispatch_count(&self) -> usize {
            self.dispatched.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ToolDispatcher for EchoDispatcher {
        async fn get_allowed_tools(&self, _agent_id: &str) -> keel_core::Result<Vec<ToolSchema>> {
            Ok(vec![ToolSchema::new("echo", "Echo the arguments")])
        }

        async fn execute_for_agent(
            &self,
            _agent_id: &str,
            calls: Vec<ToolCall>,
        ) -> keel_core::Result<Vec<ToolResult>> {
            self.dispatched.fetch_add(calls.len(), Ordering::SeqCst);
            Ok(calls
                .into_iter()
                .map(|call| {
                    if self.fail_tool.as_deref() == Some(call.name.as_str()) {
                        ToolResult::failure(call.id, call.name, "tool broke", Duration::default())
                    } else {
                        ToolResult::success(
                            call.id,
                            call.name,
                            call.arguments,
                            Duration::default(),
                        )
                    }
                })
                .collect())
        }
    }

    fn tool_call_response(calls: Vec<ToolCall>) -> ChatResponse {
        ChatResponse::new(
            Message::assistant("using tools").with_tool_calls(calls),
            FinishReason::ToolCalls,
        )
    }

    fn final_response(content: &str) -> ChatResponse {
        ChatResponse::new(Message::assistant(content), FinishReason::Stop)
    }

    fn tool_request() -> ChatRequest {
        ChatRequest::new(vec![Message::user("do the thing")])
            .with_tools(vec![ToolSchema::new("echo", "Echo the arguments")])
    }

    #[tokio::test]
    async fn test_loop_terminates_when_no_tool_calls() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call_response(vec![ToolCall::new("c1", "echo", json!({"x": 1}))]),
            final_response("done"),
        ]));
        let dispatcher = Arc::new(EchoDispatcher::new());
        let executor = ReactExecutor::new(provider.clone(), dispatcher.clone());

        let outcome = executor
            .run("agent-1", tool_request(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(provider.call_count(), 2);
        assert_eq!(dispatcher.dispatch_count(), 1);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.tool_dispatches, 1);
        assert_eq!(outcome.response.message.content, "done");
        assert!(outcome.messages.last().unwrap().is_assistant());
    }

    #[tokio::test]
    async fn test_tool_results_keep_call_order() {
        let calls = vec![
            ToolCall::new("c1", "echo", json!({"n": 1})),
            ToolCall::new("c2", "echo", json!({"n": 2})),
            ToolCall::new("c3", "echo", json!({"n": 3})),
        ];
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call_response(calls),
            final_response("done"),
        ]));
        let executor = ReactExecutor::new(provider, Arc::new(EchoDispatcher::new()));

        let outcome = executor
            .run("agent-1", tool_request(), &CancellationToken::new())
            .await
            .unwrap();

        let tool_ids: Vec<&str> = outcome
            .messages
            .iter()
            .filter(|m| m.is_tool())
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        assert_eq!(tool_ids, vec!["c1", "c2", "c3"]);
    }

    #[tokio::test]
    async fn test_max_iterations_sets_finish_reason() {
        // The model never stops asking for tools.
        let responses = (0..5)
            .map(|i| {
                tool_call_response(vec![ToolCall::new(format!("c{i}"), "echo", json!({}))])
            })
            .collect();
        let provider = Arc::new(ScriptedProvider::new(responses));
        let executor = ReactExecutor::new(provider, Arc::new(EchoDispatcher::new())).with_config(
            ReactConfig {
                max_iterations: 3,
                stop_on_error: false,
            },
        );

        let outcome = executor
            .run("agent-1", tool_request(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.iterations, 3);
        assert_eq!(outcome.response.finish_reason, FinishReason::MaxIterations);
    }

    #[tokio::test]
    async fn test_stop_on_error_breaks_loop() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call_response(vec![ToolCall::new("c1", "echo", json!({}))]),
            final_response("never reached"),
        ]));
        let executor = ReactExecutor::new(provider.clone(), Arc::new(EchoDispatcher::failing_on("echo")))
            .with_config(ReactConfig {
                max_iterations: 5,
                stop_on_error: true,
            });

        let outcome = executor
            .run("agent-1", tool_request(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(provider.call_count(), 1);
        assert!(outcome.messages.iter().any(|m| m.is_tool()));
    }

    #[tokio::test]
    async fn test_tools_require_native_function_calling() {
        let provider =
            Arc::new(ScriptedProvider::new(vec![final_response("hi")]).without_tool_support());
        let executor = ReactExecutor::new(provider, Arc::new(EchoDispatcher::new()));

        let err = executor
            .run("agent-1", tool_request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ToolsUnsupported { .. }));

        // Tool-free requests are fine on the same provider.
        let provider =
            Arc::new(ScriptedProvider::new(vec![final_response("hi")]).without_tool_support());
        let executor = ReactExecutor::new(provider, Arc::new(EchoDispatcher::new()));
        let outcome = executor
            .run(
                "agent-1",
                ChatRequest::new(vec![Message::user("hello")]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.response.message.content, "hi");
    }

    #[tokio::test]
    async fn test_tool_provider_is_preferred() {
        let expensive = Arc::new(ScriptedProvider::new(vec![final_response("expensive")]));
        let cheap = Arc::new(ScriptedProvider::new(vec![final_response("cheap")]));
        let executor = ReactExecutor::new(expensive.clone(), Arc::new(EchoDispatcher::new()))
            .with_tool_provider(cheap.clone());

        let outcome = executor
            .run(
                "agent-1",
                ChatRequest::new(vec![Message::user("hello")]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.response.message.content, "cheap");
        assert_eq!(expensive.call_count(), 0);
        assert_eq!(cheap.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_loop_returns_cancelled() {
        let provider = Arc::new(ScriptedProvider::new(vec![final_response("hi")]));
        let executor = ReactExecutor::new(provider, Arc::new(EchoDispatcher::new()));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = executor
            .run("agent-1", ChatRequest::new(vec![]), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Cancelled));
    }

    #[tokio::test]
    async fn test_stream_emits_events_in_order() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call_response(vec![ToolCall::new("c1", "echo", json!({"x": 1}))]),
            final_response("all done"),
        ]));
        let executor = ReactExecutor::new(provider, Arc::new(EchoDispatcher::new()));

        let mut rx = executor.run_stream("agent-1", tool_request(), CancellationToken::new());
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        let tools_start = events
            .iter()
            .position(|e| matches!(e, ReactEvent::ToolsStart { .. }))
            .unwrap();
        let tools_end = events
            .iter()
            .position(|e| matches!(e, ReactEvent::ToolsEnd { .. }))
            .unwrap();
        let completed = events
            .iter()
            .position(|e| matches!(e, ReactEvent::Completed { .. }))
            .unwrap();

        assert!(tools_start < tools_end);
        assert!(tools_end < completed);
        assert_eq!(completed, events.len() - 1);

        let ReactEvent::Completed { response } = &events[completed] else {
            unreachable!()
        };
        assert_eq!(response.message.content, "all done");

        // Chunks of the final turn arrive between tools_end and completed.
        let final_chunks: String = events[tools_end + 1..completed]
            .iter()
            .filter_map(|e| match e {
                ReactEvent::LlmChunk { delta } => Some(delta.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(final_chunks, "all done");
    }

    #[tokio::test]
    async fn test_stream_cancellation_closes_without_terminal() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call_response(vec![ToolCall::new("c1", "echo", json!({}))]),
            final_response("never"),
        ]));
        let executor = ReactExecutor::new(provider, Arc::new(EchoDispatcher::new()));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut rx = executor.run_stream("agent-1", tool_request(), cancel);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_stream_provider_error_is_terminal() {
        // Empty script: the first stream call fails.
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let executor = ReactExecutor::new(provider, Arc::new(EchoDispatcher::new()));

        let mut rx = executor.run_stream(
            "agent-1",
            ChatRequest::new(vec![Message::user("hi")]),
            CancellationToken::new(),
        );
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ReactEvent::Error { .. }));
    }
}
