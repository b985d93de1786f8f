//! Base agent configuration

use std::time::Duration;

/// Default ReAct iteration budget
pub const DEFAULT_MAX_REACT_ITERATIONS: usize = 10;

/// Default health probe interval
pub const DEFAULT_HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Baseline configuration of an agent
///
/// Per-invocation overrides ride in [`keel_core::RunConfig`]; these are the
/// defaults they override.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Human-readable agent name
    pub name: String,

    /// Default model identifier
    pub model: Option<String>,

    /// Default sampling temperature
    pub temperature: Option<f32>,

    /// Default generation token limit
    pub max_tokens: Option<usize>,

    /// System prompt prepended when the conversation has none
    pub system_prompt: Option<String>,

    /// ReAct iteration budget
    pub max_react_iterations: usize,

    /// Abort the ReAct loop on the first failed tool result
    pub stop_on_error: bool,

    /// Health probe interval
    pub health_check_interval: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            model: None,
            temperature: None,
            max_tokens: None,
            system_prompt: None,
            max_react_iterations: DEFAULT_MAX_REACT_ITERATIONS,
            stop_on_error: false,
            health_check_interval: DEFAULT_HEALTH_CHECK_INTERVAL,
        }
    }
}

impl AgentConfig {
    /// Create a configuration with the given display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the default sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the default generation token limit.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the ReAct iteration budget.
    pub fn with_max_react_iterations(mut self, iterations: usize) -> Self {
        self.max_react_iterations = iterations;
        self
    }

    /// Abort the ReAct loop on the first failed tool result.
    pub fn with_stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    /// Set the health probe interval.
    pub fn with_health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::new("researcher");
        assert_eq!(config.name, "researcher");
        assert_eq!(config.max_react_iterations, DEFAULT_MAX_REACT_ITERATIONS);
        assert_eq!(config.health_check_interval, DEFAULT_HEALTH_CHECK_INTERVAL);
        assert!(!config.stop_on_error);
    }

    #[test]
    fn test_builder() {
        let config = AgentConfig::new("researcher")
            .with_model("small-1")
            .with_temperature(0.3)
            .with_max_react_iterations(5)
            .with_stop_on_error(true)
            .with_health_check_interval(Duration::from_secs(5));

        assert_eq!(config.model.as_deref(), Some("small-1"));
        assert_eq!(config.max_react_iterations, 5);
        assert!(config.stop_on_error);
        assert_eq!(config.health_check_interval, Duration::from_secs(5));
    }
}
