//! Checkpoint data structures for state persistence and recovery
//!
//! A [`Checkpoint`] is a complete snapshot of an agent's conversation and
//! execution state at a point in time. Checkpoints are grouped by thread - a
//! thread is a naming scope, not an entity - and versioned per thread by the
//! store, starting at 1 with no gaps.
//!
//! # Invariants
//!
//! - `version` is assigned by the store, never by the caller (`0` means
//!   unassigned)
//! - `(thread_id, version)` is unique; `id` is globally unique across threads
//! - `created_at` is set when the record is constructed and preserved by the
//!   store thereafter
//! - a saved checkpoint is never mutated: rollback creates a *new* version
//!   annotated with [`ROLLBACK_FROM_VERSION_KEY`], it never rewrites history
//!
//! Metadata and execution variables are arbitrary JSON
//! (`serde_json::Value`); numeric values may round-trip as floating point.

use chrono::{DateTime, Utc};
use keel_core::{AgentState, Message};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Metadata key recording the source version of a rollback checkpoint
pub const ROLLBACK_FROM_VERSION_KEY: &str = "rollback_from_version";

/// Workflow position captured alongside the conversation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Workflow this execution belongs to
    pub workflow_id: String,

    /// Node the execution last completed or is positioned at
    pub current_node: String,

    /// Per-node results accumulated so far
    #[serde(default)]
    pub node_results: HashMap<String, Value>,

    /// Free-form execution variables
    #[serde(default)]
    pub variables: HashMap<String, Value>,
}

impl ExecutionContext {
    /// Create an empty context for the given workflow.
    pub fn new(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            current_node: String::new(),
            node_results: HashMap::new(),
            variables: HashMap::new(),
        }
    }
}

/// A snapshot of an agent's conversation and execution state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Globally unique checkpoint id
    pub id: String,

    /// Thread this checkpoint belongs to
    pub thread_id: String,

    /// Agent that produced the snapshot
    pub agent_id: String,

    /// Agent state at snapshot time
    pub state: AgentState,

    /// Conversation history
    #[serde(default)]
    pub messages: Vec<Message>,

    /// Opaque metadata
    #[serde(default)]
    pub metadata: HashMap<String, Value>,

    /// When the snapshot was taken; preserved across saves
    pub created_at: DateTime<Utc>,

    /// Store-assigned version, monotonically increasing per thread.
    /// `0` means not yet assigned.
    #[serde(default)]
    pub version: u64,

    /// Workflow position, when the agent was executing a plan
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_context: Option<ExecutionContext>,
}

impl Checkpoint {
    /// Create a new unversioned checkpoint with a fresh id.
    pub fn new(
        thread_id: impl Into<String>,
        agent_id: impl Into<String>,
        state: AgentState,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            thread_id: thread_id.into(),
            agent_id: agent_id.into(),
            state,
            messages,
            metadata: HashMap::new(),
            created_at: Utc::now(),
            version: 0,
            execution_context: None,
        }
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Attach an execution context.
    pub fn with_execution_context(mut self, context: ExecutionContext) -> Self {
        self.execution_context = Some(context);
        self
    }

    /// The version this checkpoint was rolled back from, if it is a
    /// rollback checkpoint.
    pub fn rollback_source_version(&self) -> Option<u64> {
        self.metadata
            .get(ROLLBACK_FROM_VERSION_KEY)
            .and_then(Value::as_u64)
    }
}

/// One entry of a thread's ordered version index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionEntry {
    /// Version number, dense from 1
    pub version: u64,

    /// Id of the checkpoint recorded at this version
    pub checkpoint_id: String,

    /// Creation time of that checkpoint
    pub created_at: DateTime<Utc>,
}
