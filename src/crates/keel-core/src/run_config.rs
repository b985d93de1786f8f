//! Per-invocation configuration overrides
//!
//! A [`RunConfig`] is an override bag attached to a single invocation. Every
//! field is optional: only set fields override the agent's base
//! configuration, and map fields are merged rather than replaced.

use crate::provider::{ChatRequest, ToolChoice};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Per-invocation overrides applied on top of the agent's base configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Override the model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Override the sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Override the generation token limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,

    /// Override top-p sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Override stop sequences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,

    /// Override the tool usage policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,

    /// Deadline for the whole invocation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    /// Override the ReAct iteration budget
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_react_iterations: Option<usize>,

    /// Metadata merged into the outgoing request
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,

    /// Free-form invocation tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl RunConfig {
    /// Create an empty override bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Override the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Override the generation token limit.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Override top-p sampling.
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Override stop sequences.
    pub fn with_stop_sequences(mut self, sequences: Vec<String>) -> Self {
        self.stop_sequences = Some(sequences);
        self
    }

    /// Override the tool usage policy.
    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    /// Set a deadline for the whole invocation.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the ReAct iteration budget.
    pub fn with_max_react_iterations(mut self, iterations: usize) -> Self {
        self.max_react_iterations = Some(iterations);
        self
    }

    /// Merge a metadata entry into the bag.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Add an invocation tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Apply set fields onto an outgoing request.
    ///
    /// Scalar overrides overwrite; `metadata` is merged key-by-key.
    pub fn apply(&self, request: &mut ChatRequest) {
        if let Some(model) = &self.model {
            request.config.model = Some(model.clone());
        }
        if let Some(temperature) = self.temperature {
            request.config.temperature = Some(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            request.config.max_tokens = Some(max_tokens);
        }
        if let Some(top_p) = self.top_p {
            request.config.top_p = Some(top_p);
        }
        if let Some(sequences) = &self.stop_sequences {
            request.config.stop_sequences = sequences.clone();
        }
        if let Some(choice) = &self.tool_choice {
            request.config.tool_choice = Some(choice.clone());
        }
        if let Some(timeout) = self.timeout {
            request.config.timeout = Some(timeout);
        }
        for (key, value) in &self.metadata {
            request
                .config
                .metadata
                .insert(key.clone(), value.clone());
        }
    }

    /// Effective ReAct iteration budget: the override if set, else the
    /// agent's default.
    pub fn effective_max_iterations(&self, agent_default: usize) -> usize {
        self.max_react_iterations.unwrap_or(agent_default)
    }
}
