//! Step plans and resumable execution state
//!
//! A plan is an ordered list of named async steps executed by
//! [`Agent::execute_plan`](crate::agent::Agent::execute_plan). The agent
//! snapshots a checkpoint at every step boundary; a run resumed from a
//! checkpoint with recorded position `k` skips steps `0..k-1` and executes
//! `k..` exactly once, in order.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Execution variable recording the index of the next step to run
pub const CURRENT_STEP_KEY: &str = "current_step";

/// Read-only view of execution state handed to a step body
#[derive(Debug, Clone, Default)]
pub struct StepContext {
    /// Execution variables accumulated so far
    pub variables: HashMap<String, Value>,

    /// Results of previously completed steps, by step name
    pub node_results: HashMap<String, Value>,
}

type StepBody =
    Arc<dyn Fn(StepContext) -> BoxFuture<'static, std::result::Result<Value, String>> + Send + Sync>;

/// One named step of a plan
#[derive(Clone)]
pub struct PlanStep {
    /// Step name; also the key its result is recorded under
    pub name: String,

    body: StepBody,
}

impl PlanStep {
    /// Create a step from an async closure.
    ///
    /// The closure receives the execution state accumulated so far and
    /// returns the step's result, or an error message that fails the plan.
    pub fn new<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(StepContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Value, String>> + Send + 'static,
    {
        Self {
            name: name.into(),
            body: Arc::new(move |context| body(context).boxed()),
        }
    }

    pub(crate) fn invoke(
        &self,
        context: StepContext,
    ) -> BoxFuture<'static, std::result::Result<Value, String>> {
        (self.body)(context)
    }
}

impl std::fmt::Debug for PlanStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanStep").field("name", &self.name).finish()
    }
}

/// An ordered list of steps executed under one workflow and thread
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    /// Workflow identity recorded in checkpoints and events
    pub workflow_id: String,

    /// Thread the plan's checkpoints belong to
    pub thread_id: String,

    /// Steps, executed in order
    pub steps: Vec<PlanStep>,
}

impl ExecutionPlan {
    /// Create an empty plan.
    pub fn new(workflow_id: impl Into<String>, thread_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            thread_id: thread_id.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step.
    pub fn with_step<F, Fut>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(StepContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Value, String>> + Send + 'static,
    {
        self.steps.push(PlanStep::new(name, body));
        self
    }
}
