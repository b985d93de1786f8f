//! # keel-agent - Lifecycle, ReAct Loop and Stream Fan-out
//!
//! The executor layer of the keel runtime. An [`Agent`] wraps an LLM
//! provider, a tool dispatcher, an event bus and (optionally) a checkpoint
//! store, and drives all work through its state machine:
//!
//! - **[`ReactExecutor`]** - the multi-iteration LLM <-> tool loop, in
//!   blocking and streaming form
//! - **[`Agent::chat`] / [`Agent::chat_stream`]** - chat turns through the
//!   loop, with per-invocation [`RunConfig`](keel_core::RunConfig)
//!   overrides and stream fan-out to the caller and the event bus
//! - **[`Agent::execute_plan`]** - resumable step-plan execution with a
//!   checkpoint at every step boundary
//! - **[`LifecycleManager`]** - start/stop/restart plus the periodic health
//!   probe
//! - **[`ToolSelector`]** - optional score-based pruning of the tool
//!   whitelist per request
//!
//! ## Example
//!
//! ```rust,ignore
//! use keel_agent::{Agent, AgentConfig, LifecycleManager};
//! use keel_core::Message;
//! use std::sync::Arc;
//!
//! let agent = Arc::new(
//!     Agent::builder("researcher")
//!         .with_config(AgentConfig::new("researcher").with_model("small-1"))
//!         .with_provider(my_provider)
//!         .with_dispatcher(my_dispatcher)
//!         .build()?,
//! );
//!
//! let lifecycle = LifecycleManager::new(Arc::clone(&agent));
//! lifecycle.start().await?;
//!
//! let response = agent.chat(vec![Message::user("hello")], None).await?;
//! lifecycle.stop().await?;
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod plan;
pub mod react;
pub mod selector;
pub mod stream;

pub use agent::{Agent, AgentBuilder};
pub use config::{AgentConfig, DEFAULT_HEALTH_CHECK_INTERVAL, DEFAULT_MAX_REACT_ITERATIONS};
pub use error::{AgentError, Result};
pub use lifecycle::{HealthStatus, LifecycleManager, TEARDOWN_WAIT};
pub use plan::{ExecutionPlan, PlanStep, StepContext, CURRENT_STEP_KEY};
pub use react::{ReactConfig, ReactEvent, ReactExecutor, ReactOutcome};
pub use selector::{SelectorWeights, ToolSelector, ToolStats};
pub use stream::{AgentStreamEvent, STREAM_HANDOFF_TIMEOUT};
