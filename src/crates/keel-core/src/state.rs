//! Agent lifecycle states and the transition table that governs them
//!
//! The agent holds exactly one [`AgentState`] at a time and every change goes
//! through [`StateMachine::transition`], which validates against the legal
//! transition table and applies atomically. An illegal transition fails with
//! [`CoreError::InvalidTransition`] and leaves the current state untouched.
//!
//! # Transition Table
//!
//! | From | Legal targets |
//! |------|---------------|
//! | `init` | `ready`, `failed` |
//! | `ready` | `running`, `failed` |
//! | `running` | `ready`, `paused`, `completed`, `failed` |
//! | `paused` | `running`, `completed`, `failed` |
//! | `completed` | `ready` (re-schedulable) |
//! | `failed` | `ready`, `init` (retry or reset) |

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::RwLock;

/// Lifecycle state of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    /// Agent is constructed but not yet initialized
    Init,
    /// Agent is initialized and idle
    Ready,
    /// Agent is executing work
    Running,
    /// Agent execution is suspended
    Paused,
    /// Agent finished its work
    Completed,
    /// Agent hit an unrecoverable error
    Failed,
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentState::Init => "init",
            AgentState::Ready => "ready",
            AgentState::Running => "running",
            AgentState::Paused => "paused",
            AgentState::Completed => "completed",
            AgentState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Legal targets for a given source state.
pub fn legal_targets(from: AgentState) -> &'static [AgentState] {
    use AgentState::*;
    match from {
        Init => &[Ready, Failed],
        Ready => &[Running, Failed],
        Running => &[Ready, Paused, Completed, Failed],
        Paused => &[Running, Completed, Failed],
        Completed => &[Ready],
        Failed => &[Ready, Init],
    }
}

/// Pure lookup against the transition table.
pub fn can_transition(from: AgentState, to: AgentState) -> bool {
    legal_targets(from).contains(&to)
}

/// An applied state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// State before the transition
    pub from: AgentState,
    /// State after the transition
    pub to: AgentState,
}

/// Holder for an agent's current state with atomic validate-and-apply
///
/// The owner is responsible for emitting a `state_change` event for every
/// successful [`transition`](StateMachine::transition); the returned
/// [`Transition`] carries the endpoints for that.
#[derive(Debug)]
pub struct StateMachine {
    current: RwLock<AgentState>,
}

impl StateMachine {
    /// Create a state machine starting at [`AgentState::Init`].
    pub fn new() -> Self {
        Self::with_state(AgentState::Init)
    }

    /// Create a state machine starting at the given state.
    ///
    /// Used when restoring an agent from a checkpoint.
    pub fn with_state(state: AgentState) -> Self {
        Self {
            current: RwLock::new(state),
        }
    }

    /// Current state.
    pub fn current(&self) -> AgentState {
        match self.current.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Validate and apply a transition atomically.
    ///
    /// On violation the state is left unchanged and
    /// [`CoreError::InvalidTransition`] is returned.
    pub fn transition(&self, to: AgentState) -> Result<Transition> {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let from = *guard;
        if !can_transition(from, to) {
            return Err(CoreError::InvalidTransition { from, to });
        }
        *guard = to;
        Ok(Transition { from, to })
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
