//! Score-based tool selection
//!
//! An optional optimization in front of the first LLM call: when an agent
//! has a wide tool whitelist, the selector prunes it to the tools most
//! relevant for the request, scored by a weighted blend of query similarity
//! and recorded cost/latency/reliability per tool. Correctness never depends
//! on the pruning - the selection is always a subset of the input list.

use keel_core::ToolSchema;
use std::collections::{HashMap, HashSet};

/// Weights for the selection score
#[derive(Debug, Clone)]
pub struct SelectorWeights {
    /// Weight of query/description similarity
    pub similarity: f32,
    /// Weight of (inverse) tool cost
    pub cost: f32,
    /// Weight of (inverse) tool latency
    pub latency: f32,
    /// Weight of recorded reliability
    pub reliability: f32,
}

impl Default for SelectorWeights {
    fn default() -> Self {
        Self {
            similarity: 0.4,
            cost: 0.2,
            latency: 0.2,
            reliability: 0.2,
        }
    }
}

/// Recorded runtime characteristics of one tool
#[derive(Debug, Clone)]
pub struct ToolStats {
    /// Normalized cost in `[0, 1]`, higher is more expensive
    pub cost: f32,
    /// Typical execution latency in milliseconds
    pub latency_ms: f32,
    /// Success rate in `[0, 1]`
    pub reliability: f32,
}

impl Default for ToolStats {
    fn default() -> Self {
        Self {
            cost: 0.5,
            latency_ms: 100.0,
            reliability: 1.0,
        }
    }
}

/// Prunes a tool list to the highest-scoring candidates for a request
#[derive(Debug, Clone)]
pub struct ToolSelector {
    weights: SelectorWeights,
    stats: HashMap<String, ToolStats>,
    max_tools: usize,
}

impl ToolSelector {
    /// Create a selector that keeps at most `max_tools` tools.
    pub fn new(max_tools: usize) -> Self {
        Self {
            weights: SelectorWeights::default(),
            stats: HashMap::new(),
            max_tools,
        }
    }

    /// Set the score weights.
    pub fn with_weights(mut self, weights: SelectorWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Record runtime characteristics for a tool.
    pub fn with_stats(mut self, tool: impl Into<String>, stats: ToolStats) -> Self {
        self.stats.insert(tool.into(), stats);
        self
    }

    /// Select up to `max_tools` tools for the given request text.
    ///
    /// Returns the input unchanged when it already fits the budget; the
    /// result is always a subset of `tools`, ordered by descending score.
    pub fn select(&self, query: &str, tools: &[ToolSchema]) -> Vec<ToolSchema> {
        if tools.len() <= self.max_tools {
            return tools.to_vec();
        }

        let mut scored: Vec<(f32, &ToolSchema)> = tools
            .iter()
            .map(|tool| (self.score(query, tool), tool))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .take(self.max_tools)
            .map(|(_, tool)| tool.clone())
            .collect()
    }

    fn score(&self, query: &str, tool: &ToolSchema) -> f32 {
        let stats = self.stats.get(&tool.name).cloned().unwrap_or_default();
        let text = format!("{} {}", tool.name, tool.description);
        let similarity = Self::similarity(query, &text);

        self.weights.similarity * similarity
            + self.weights.cost * (1.0 - stats.cost.clamp(0.0, 1.0))
            + self.weights.latency * (1.0 / (1.0 + stats.latency_ms.max(0.0) / 1000.0))
            + self.weights.reliability * stats.reliability.clamp(0.0, 1.0)
    }

    /// Word-overlap similarity between the request and a tool's text.
    fn similarity(query: &str, text: &str) -> f32 {
        let query_words: HashSet<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|w| !w.is_empty())
            .collect();
        if query_words.is_empty() {
            return 0.0;
        }
        let text_words: HashSet<String> = text
            .to_lowercase()
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|w| !w.is_empty())
            .collect();

        let overlap = query_words.intersection(&text_words).count();
        overlap as f32 / query_words.len() as f32
    }
}
