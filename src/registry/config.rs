//! TOML loading for the model registry.
//!
//! ```toml
//! default = "phi3-mini-educational"
//!
//! [[models]]
//! id = "phi3-mini-educational"
//! provider_kind = "ollama"
//! model_name = "phi3:mini"
//! complexity_tier = "simple"
//! cost_per_1k_tokens = 0.0001
//! subject_affinity = ["math", "science"]
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::ModelRegistry;
use crate::types::ModelDescriptor;
use crate::{MimirError, Result};

/// On-disk registry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Default model id; must name an entry in `models`.
    pub default: String,
    #[serde(default)]
    pub models: Vec<ModelDescriptor>,
}

impl RegistryConfig {
    /// Load registry configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            MimirError::Configuration(format!("failed to read registry config {path:?}: {e}"))
        })?;
        Self::parse(&content)
    }

    /// Parse registry configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| MimirError::Configuration(format!("invalid registry config: {e}")))
    }

    /// Build the registry, validating the default model reference.
    pub fn into_registry(self) -> Result<ModelRegistry> {
        ModelRegistry::new(self.models, self.default)
    }
}
