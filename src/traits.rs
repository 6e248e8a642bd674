//! Traits for external collaborators: inference backends and the
//! opaque usage/persistence store.
//!
//! The gateway core never couples to a concrete provider; everything
//! behind these traits is pluggable and mockable in tests.

use async_trait::async_trait;

use crate::Result;
use crate::types::ModelDescriptor;

/// One completed backend generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    /// Prompt + completion tokens, as reported by the provider.
    pub tokens_used: u32,
}

/// A model-inference backend.
///
/// Implementations issue a single bounded call; the router owns the
/// timeout, retry-to-alternate, and canary sampling around it.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend name for logs and metrics (e.g. "ollama").
    fn name(&self) -> &str;

    /// Generate a completion for `prompt` using the configured model.
    async fn generate(&self, model: &ModelDescriptor, prompt: &str) -> Result<Generation>;
}

/// One usage record for cost analytics.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRecord {
    pub student_id: String,
    pub model_id: String,
    pub tokens_used: u32,
    pub cost: f64,
}

/// Opaque persistence for usage metrics.
///
/// Failures here never fail the request; the router absorbs them with
/// a warning.
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn record_usage(&self, record: UsageRecord) -> Result<()>;
}
