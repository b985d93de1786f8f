//! # keel-core - State Machine, Event Bus and Shared Interfaces
//!
//! Foundation crate of the keel agent runtime. It owns the pieces every other
//! subsystem builds on:
//!
//! - **[`AgentState`] / [`StateMachine`]** - the lifecycle state enum and its
//!   table-driven transition discipline
//! - **[`EventBus`]** - async pub-sub with typed events, generated
//!   subscription ids and panic-isolated handlers
//! - **[`AgentEvent`] / [`EventType`]** - the canonical event model
//! - **[`Message`] / [`ToolSchema`] / [`ToolCall`] / [`ToolResult`]** - the
//!   conversation and tool data types threaded through the ReAct loop
//! - **[`ModelProvider`] / [`ToolDispatcher`]** - the interfaces consumed by
//!   the runtime; concrete LLM clients and tool bodies live outside the core
//! - **[`RunConfig`]** - per-invocation configuration overrides
//!
//! The crate deliberately contains no I/O beyond the bus's channels. LLM
//! transports, tool implementations and persistence live in sibling crates
//! behind the traits defined here.

pub mod bus;
pub mod error;
pub mod events;
pub mod messages;
pub mod provider;
pub mod run_config;
pub mod state;
pub mod tools;

pub use bus::{EventBus, EventHandler, FnHandler, SubscriptionId, DEFAULT_MAILBOX_CAPACITY};
pub use error::{CoreError, Result};
pub use events::{AgentEvent, EventPayload, EventType, ToolCallStage};
pub use messages::{Message, MessageRole};
pub use provider::{
    ChatConfig, ChatRequest, ChatResponse, ChunkDelta, ChunkStream, FinishReason, ModelProvider,
    StreamChunk, ToolChoice, UsageMetadata,
};
pub use run_config::RunConfig;
pub use state::{can_transition, legal_targets, AgentState, StateMachine, Transition};
pub use tools::{ToolCall, ToolDispatcher, ToolResult, ToolSchema};
