//! Builder for configuring gateway instances.

use std::sync::Arc;

use super::Mimir;
use crate::cache::{AnswerCache, CacheConfig};
use crate::canary::CanaryController;
use crate::limiter::{RateLimitConfig, RateLimiter};
use crate::registry::ModelRegistry;
use crate::traits::{Backend, UsageStore};
use crate::{MimirError, Result};

/// Builder for configuring gateway instances.
///
/// A backend and a model registry are required; cache and rate-limit
/// configuration fall back to defaults.
pub struct MimirBuilder {
    backend: Option<Arc<dyn Backend>>,
    registry: Option<Arc<ModelRegistry>>,
    cache_config: CacheConfig,
    rate_config: RateLimitConfig,
    usage_store: Option<Arc<dyn UsageStore>>,
}

impl MimirBuilder {
    pub fn new() -> Self {
        Self {
            backend: None,
            registry: None,
            cache_config: CacheConfig::default(),
            rate_config: RateLimitConfig::default(),
            usage_store: None,
        }
    }

    /// Set the inference backend.
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the model registry.
    pub fn registry(mut self, registry: ModelRegistry) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// Configure the answer cache.
    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Configure per-tier rate limits.
    pub fn rate_limits(mut self, config: RateLimitConfig) -> Self {
        self.rate_config = config;
        self
    }

    /// Attach an optional usage store for cost analytics.
    pub fn usage_store(mut self, store: Arc<dyn UsageStore>) -> Self {
        self.usage_store = Some(store);
        self
    }

    /// Build the gateway.
    pub fn build(self) -> Result<Mimir> {
        let backend = self
            .backend
            .ok_or_else(|| MimirError::Configuration("no backend configured".to_owned()))?;
        let registry = self
            .registry
            .ok_or_else(|| MimirError::Configuration("no model registry configured".to_owned()))?;

        let default_ttl = self.cache_config.default_ttl;
        let cache = AnswerCache::new(&self.cache_config);
        let limiter = RateLimiter::new(self.rate_config);
        let canary = CanaryController::new(Arc::clone(&registry));

        Ok(Mimir {
            backend,
            registry,
            cache,
            limiter,
            canary,
            usage_store: self.usage_store,
            default_ttl,
        })
    }
}

impl Default for MimirBuilder {
    fn default() -> Self {
        Self::new()
    }
}
