//! Mimir - Educational LLM routing gateway
//!
//! This crate routes student questions to the cheapest adequate model,
//! caches answers by semantic fingerprint, enforces per-identity rate
//! limits, and manages gradual canary migrations between models with
//! automatic health-based rollback.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mimir::{AskRequest, GradeLevel, Mimir, OllamaBackend, Subject};
//! use mimir::registry::RegistryConfig;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> mimir::Result<()> {
//!     let registry = RegistryConfig::load("models.toml")?.into_registry()?;
//!     let gateway = Mimir::builder()
//!         .backend(Arc::new(OllamaBackend::new()))
//!         .registry(registry)
//!         .build()?;
//!
//!     let request = AskRequest::new(
//!         "student-42",
//!         "Why is the sky blue?",
//!         Subject::Physics,
//!         GradeLevel::MiddleSchool,
//!     );
//!     let response = gateway.ask(&request).await?;
//!
//!     println!("[{}] {}", response.model_used, response.answer);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cache;
pub mod canary;
pub mod error;
pub mod limiter;
pub mod registry;
pub mod router;
pub mod telemetry;
pub mod traits;
pub mod types;

// Re-export main types at crate root
pub use backend::OllamaBackend;
pub use cache::{AnswerCache, CacheConfig, CacheEntry, CacheStats, Fingerprint};
pub use canary::{
    CanaryController, CanaryState, CanaryStatus, HealthThresholds, MigrationSpec, TrafficSplit,
};
pub use error::{MimirError, Result};
pub use limiter::{Decision, RateLimitConfig, RateLimiter, TierLimits};
pub use registry::{ModelRegistry, RegistryConfig};
pub use router::{Mimir, MimirBuilder};
pub use traits::{Backend, Generation, UsageRecord, UsageStore};

// Re-export all request/response types
pub use types::{
    AskRequest, AskResponse, ComplexityTier, ConversationTurn, GradeLevel, ModelDescriptor,
    ProviderKind, ResponseSource, Subject, Tier,
};
