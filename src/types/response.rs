//! Outbound response types.

use serde::{Deserialize, Serialize};

/// Where an answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Llm,
}

/// Answer to a teaching request, with routing and cost metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub model_used: String,
    pub tokens_used: u32,
    /// Estimated cost in USD for the backend call that produced this
    /// answer; cache hits carry the original generation's estimate.
    pub estimated_cost: f64,
    /// Heuristic confidence score in [0.0, 1.0].
    pub confidence: f64,
    pub source: ResponseSource,
    pub processing_time_ms: u64,
    #[serde(default)]
    pub follow_up_suggestions: Vec<String>,
    #[serde(default)]
    pub learning_resources: Vec<String>,
}
