//! The agent: a stateful executor wrapping provider, dispatcher, bus and
//! checkpoint store
//!
//! An [`Agent`] owns one [`StateMachine`] and drives all work through it:
//! chat turns move `ready -> running -> ready` (or `failed`), plan execution
//! moves `ready -> running -> completed`. Every successful transition is
//! published on the event bus as a `state_change` event, and chat/tool
//! activity is mirrored as observability events alongside the
//! consumer-facing stream.

use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::plan::{ExecutionPlan, StepContext, CURRENT_STEP_KEY};
use crate::react::{ReactConfig, ReactEvent, ReactExecutor};
use crate::selector::ToolSelector;
use crate::stream::{translate, AgentStreamEvent, STREAM_HANDOFF_TIMEOUT};
use keel_checkpoint::{Checkpoint, CheckpointStore, ExecutionContext};
use keel_core::{
    AgentEvent, AgentState, ChatRequest, ChatResponse, EventBus, EventPayload, Message,
    MessageRole, ModelProvider, RunConfig, StateMachine, ToolCall, ToolCallStage, ToolDispatcher,
    ToolSchema,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Capacity of the consumer-facing stream channel
const STREAM_CHANNEL_CAPACITY: usize = 100;

/// A stateful LLM-driven executor
pub struct Agent {
    id: String,
    config: AgentConfig,
    state: StateMachine,
    provider: Arc<dyn ModelProvider>,
    tool_provider: Option<Arc<dyn ModelProvider>>,
    dispatcher: Arc<dyn ToolDispatcher>,
    bus: Arc<EventBus>,
    store: Option<Arc<dyn CheckpointStore>>,
    selector: Option<ToolSelector>,
}

impl Agent {
    /// Start building an agent with the given id.
    pub fn builder(id: impl Into<String>) -> AgentBuilder {
        AgentBuilder::new(id)
    }

    /// The agent's id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The agent's base configuration.
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AgentState {
        self.state.current()
    }

    /// The event bus observers subscribe on.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Apply a state transition and publish the `state_change` event.
    pub fn transition(&self, to: AgentState) -> Result<()> {
        let transition = self.state.transition(to)?;
        tracing::info!(
            agent_id = %self.id,
            from = %transition.from,
            to = %transition.to,
            "state transition"
        );
        self.bus.publish(AgentEvent::new(
            &self.id,
            EventPayload::StateChange {
                from: transition.from,
                to: transition.to,
            },
        ));
        Ok(())
    }

    /// Bring the agent to `ready`.
    ///
    /// Called by the lifecycle manager on start; legal from `init`,
    /// `completed` and `failed`.
    pub async fn init(&self) -> Result<()> {
        if self.state() == AgentState::Ready {
            return Ok(());
        }
        self.transition(AgentState::Ready)
    }

    /// Wind the agent down after the lifecycle manager stops it.
    pub async fn teardown(&self) -> Result<()> {
        if matches!(self.state(), AgentState::Running | AgentState::Paused) {
            self.transition(AgentState::Completed)?;
        }
        Ok(())
    }

    fn record_failure(&self, message: &str) {
        self.bus.publish(AgentEvent::new(
            &self.id,
            EventPayload::Error {
                message: message.to_string(),
            },
        ));
        if let Err(e) = self.transition(AgentState::Failed) {
            tracing::warn!(agent_id = %self.id, error = %e, "could not mark agent failed");
        }
    }

    fn build_request(
        &self,
        mut messages: Vec<Message>,
        tools: Vec<ToolSchema>,
        run: Option<&RunConfig>,
    ) -> ChatRequest {
        if let Some(prompt) = &self.config.system_prompt {
            let has_system = messages
                .first()
                .map(|m| m.role == MessageRole::System)
                .unwrap_or(false);
            if !has_system {
                messages.insert(0, Message::system(prompt.clone()));
            }
        }

        let mut request = ChatRequest::new(messages);
        request.config.model = self.config.model.clone();
        request.config.temperature = self.config.temperature;
        request.config.max_tokens = self.config.max_tokens;
        request.config.tools = tools;
        if let Some(run) = run {
            run.apply(&mut request);
        }
        request
    }

    fn executor(&self, run: Option<&RunConfig>) -> ReactExecutor {
        let max_iterations = run
            .map(|r| r.effective_max_iterations(self.config.max_react_iterations))
            .unwrap_or(self.config.max_react_iterations);
        let mut executor =
            ReactExecutor::new(Arc::clone(&self.provider), Arc::clone(&self.dispatcher))
                .with_config(ReactConfig {
                    max_iterations,
                    stop_on_error: self.config.stop_on_error,
                });
        if let Some(tool_provider) = &self.tool_provider {
            executor = executor.with_tool_provider(Arc::clone(tool_provider));
        }
        executor
    }

    async fn allowed_tools(&self, messages: &[Message]) -> Result<Vec<ToolSchema>> {
        let tools = self.dispatcher.get_allowed_tools(&self.id).await?;
        let query = messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.clone());
        Ok(match (&self.selector, query) {
            (Some(selector), Some(query)) => selector.select(&query, &tools),
            _ => tools,
        })
    }

    /// Run a blocking chat turn through the ReAct loop.
    pub async fn chat(
        &self,
        messages: Vec<Message>,
        run: Option<RunConfig>,
    ) -> Result<ChatResponse> {
        self.transition(AgentState::Running)?;

        match self.chat_inner(messages, run.as_ref()).await {
            Ok(response) => {
                self.transition(AgentState::Ready)?;
                self.bus.publish(AgentEvent::new(
                    &self.id,
                    EventPayload::Complete {
                        result: json!({ "content": response.message.content }),
                    },
                ));
                Ok(response)
            }
            Err(e) => {
                self.record_failure(&e.to_string());
                Err(e)
            }
        }
    }

    async fn chat_inner(
        &self,
        messages: Vec<Message>,
        run: Option<&RunConfig>,
    ) -> Result<ChatResponse> {
        let tools = self.allowed_tools(&messages).await?;
        let request = self.build_request(messages, tools, run);
        let executor = self.executor(run);
        let cancel = CancellationToken::new();

        let outcome = match run.and_then(|r| r.timeout) {
            Some(deadline) => {
                match tokio::time::timeout(deadline, executor.run(&self.id, request, &cancel))
                    .await
                {
                    Ok(result) => result?,
                    Err(_) => {
                        cancel.cancel();
                        return Err(AgentError::Timeout);
                    }
                }
            }
            None => executor.run(&self.id, request, &cancel).await?,
        };
        Ok(outcome.response)
    }

    /// Run a streaming chat turn.
    ///
    /// Returns a channel of [`AgentStreamEvent`]s: `token` per generated
    /// token, then `tool_call` / `tool_result` pairs per dispatched call.
    /// The channel closes exactly once, after the turn completes or fails;
    /// dropping the receiver cancels the turn.
    pub async fn chat_stream(
        self: Arc<Self>,
        messages: Vec<Message>,
        run: Option<RunConfig>,
    ) -> Result<mpsc::Receiver<AgentStreamEvent>> {
        self.transition(AgentState::Running)?;

        let tools = match self.allowed_tools(&messages).await {
            Ok(tools) => tools,
            Err(e) => {
                self.record_failure(&e.to_string());
                return Err(e);
            }
        };
        let request = self.build_request(messages, tools, run.as_ref());
        let executor = self.executor(run.as_ref());
        let cancel = CancellationToken::new();
        let mut react_rx = executor.run_stream(&self.id, request, cancel.clone());

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let agent = Arc::clone(&self);
        tokio::spawn(async move {
            let mut pending_calls: Vec<ToolCall> = Vec::new();
            let mut terminal_seen = false;

            while let Some(event) = react_rx.recv().await {
                agent.observe(&event, &mut pending_calls);
                let is_terminal =
                    matches!(&event, ReactEvent::Completed { .. } | ReactEvent::Error { .. });

                for out in translate(event) {
                    match tokio::time::timeout(STREAM_HANDOFF_TIMEOUT, tx.send(out)).await {
                        Ok(Ok(())) => {}
                        Ok(Err(_)) | Err(_) => {
                            // Consumer gone or stalled past the handoff
                            // deadline; cancel the loop and bail out.
                            cancel.cancel();
                            return;
                        }
                    }
                }
                if is_terminal {
                    terminal_seen = true;
                    break;
                }
            }

            if !terminal_seen && agent.state() == AgentState::Running {
                if let Err(e) = agent.transition(AgentState::Ready) {
                    tracing::warn!(agent_id = %agent.id, error = %e, "could not reset agent state");
                }
            }
        });

        Ok(rx)
    }

    /// Mirror one executor event onto the bus and track terminal state.
    fn observe(&self, event: &ReactEvent, pending_calls: &mut Vec<ToolCall>) {
        match event {
            ReactEvent::LlmChunk { delta } => {
                self.bus.publish(AgentEvent::new(
                    &self.id,
                    EventPayload::Token {
                        token: delta.clone(),
                        delta: delta.clone(),
                    },
                ));
            }
            ReactEvent::ToolsStart { tool_calls } => {
                *pending_calls = tool_calls.clone();
                self.bus.publish(AgentEvent::new(
                    &self.id,
                    EventPayload::ToolCallDispatched {
                        calls: tool_calls.clone(),
                    },
                ));
                for call in tool_calls {
                    self.bus.publish(AgentEvent::new(
                        &self.id,
                        EventPayload::ToolCall {
                            stage: ToolCallStage::Start,
                            call: call.clone(),
                        },
                    ));
                }
            }
            ReactEvent::ToolsEnd { tool_results } => {
                self.bus.publish(AgentEvent::new(
                    &self.id,
                    EventPayload::ToolResult {
                        results: tool_results.clone(),
                    },
                ));
                for call in pending_calls.drain(..) {
                    self.bus.publish(AgentEvent::new(
                        &self.id,
                        EventPayload::ToolCall {
                            stage: ToolCallStage::End,
                            call,
                        },
                    ));
                }
            }
            ReactEvent::Completed { response } => {
                if let Err(e) = self.transition(AgentState::Ready) {
                    tracing::warn!(agent_id = %self.id, error = %e, "could not reset agent state");
                }
                self.bus.publish(AgentEvent::new(
                    &self.id,
                    EventPayload::Complete {
                        result: json!({ "content": response.message.content }),
                    },
                ));
            }
            ReactEvent::Error { message } => {
                self.record_failure(message);
            }
        }
    }

    /// Snapshot the current conversation and execution state into the
    /// checkpoint store.
    pub async fn snapshot(
        &self,
        thread_id: &str,
        messages: Vec<Message>,
        context: Option<ExecutionContext>,
    ) -> Result<Checkpoint> {
        let store = self.require_store()?;
        let mut checkpoint = Checkpoint::new(thread_id, &self.id, self.state(), messages);
        if let Some(context) = context {
            checkpoint = checkpoint.with_execution_context(context);
        }
        Ok(store.save(checkpoint).await?)
    }

    /// Load the latest checkpoint of a thread, e.g. to resume a plan.
    pub async fn latest_checkpoint(&self, thread_id: &str) -> Result<Checkpoint> {
        let store = self.require_store()?;
        Ok(store.load_latest(thread_id).await?)
    }

    fn require_store(&self) -> Result<&Arc<dyn CheckpointStore>> {
        self.store
            .as_ref()
            .ok_or_else(|| AgentError::Configuration("checkpoint store not set".to_string()))
    }

    /// Execute a step plan, checkpointing at every step boundary.
    ///
    /// When `resume_from` carries an execution context with a recorded
    /// position `k`, steps `0..k-1` are skipped and `k..` run exactly once,
    /// in order. Returns the final execution context.
    pub async fn execute_plan(
        &self,
        plan: &ExecutionPlan,
        resume_from: Option<&Checkpoint>,
    ) -> Result<ExecutionContext> {
        let mut context = resume_from
            .and_then(|cp| cp.execution_context.clone())
            .unwrap_or_else(|| ExecutionContext::new(plan.workflow_id.clone()));
        let start = context
            .variables
            .get(CURRENT_STEP_KEY)
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0) as usize;

        self.transition(AgentState::Running)?;
        tracing::debug!(
            agent_id = %self.id,
            workflow_id = %plan.workflow_id,
            start,
            total = plan.steps.len(),
            "executing plan"
        );

        for (index, step) in plan.steps.iter().enumerate().skip(start) {
            self.bus.publish(AgentEvent::new(
                &self.id,
                EventPayload::Execute {
                    workflow_id: plan.workflow_id.clone(),
                    node: step.name.clone(),
                },
            ));

            let step_context = StepContext {
                variables: context.variables.clone(),
                node_results: context.node_results.clone(),
            };
            let output = match step.invoke(step_context).await {
                Ok(output) => output,
                Err(message) => {
                    let message = format!("step '{}' failed: {message}", step.name);
                    self.record_failure(&message);
                    return Err(AgentError::Execution(message));
                }
            };

            context.current_node = step.name.clone();
            context.node_results.insert(step.name.clone(), output);
            context
                .variables
                .insert(CURRENT_STEP_KEY.to_string(), json!(index + 1));

            if let Some(store) = &self.store {
                let checkpoint = Checkpoint::new(&plan.thread_id, &self.id, self.state(), vec![])
                    .with_execution_context(context.clone());
                store.save(checkpoint).await?;
            }
        }

        self.transition(AgentState::Completed)?;
        self.bus.publish(AgentEvent::new(
            &self.id,
            EventPayload::Complete {
                result: json!({ "workflow_id": plan.workflow_id }),
            },
        ));
        Ok(context)
    }
}

/// Builder for [`Agent`]
pub struct AgentBuilder {
    id: String,
    config: AgentConfig,
    provider: Option<Arc<dyn ModelProvider>>,
    tool_provider: Option<Arc<dyn ModelProvider>>,
    dispatcher: Option<Arc<dyn ToolDispatcher>>,
    bus: Option<Arc<EventBus>>,
    store: Option<Arc<dyn CheckpointStore>>,
    selector: Option<ToolSelector>,
}

impl AgentBuilder {
    /// Create a builder for an agent with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            config: AgentConfig::new(id.clone()),
            id,
            provider: None,
            tool_provider: None,
            dispatcher: None,
            bus: None,
            store: None,
            selector: None,
        }
    }

    /// Set the base configuration.
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the LLM provider (required).
    pub fn with_provider(mut self, provider: Arc<dyn ModelProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Prefer a cheaper provider for tool-call iterations.
    pub fn with_tool_provider(mut self, provider: Arc<dyn ModelProvider>) -> Self {
        self.tool_provider = Some(provider);
        self
    }

    /// Set the tool dispatcher (required).
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn ToolDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Share an existing event bus instead of creating one.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Persist checkpoints to the given store.
    pub fn with_checkpoint_store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Prune the tool whitelist per request with a selector.
    pub fn with_tool_selector(mut self, selector: ToolSelector) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Build the agent.
    ///
    /// Fails with a configuration error when the provider or dispatcher is
    /// missing.
    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Configuration("model provider not set".to_string()))?;
        let dispatcher = self
            .dispatcher
            .ok_or_else(|| AgentError::Configuration("tool dispatcher not set".to_string()))?;

        Ok(Agent {
            id: self.id,
            config: self.config,
            state: StateMachine::new(),
            provider,
            tool_provider: self.tool_provider,
            dispatcher,
            bus: self.bus.unwrap_or_else(|| Arc::new(EventBus::new())),
            store: self.store,
            selector: self.selector,
        })
    }
}
