//! Model descriptors: the registry's unit of configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::request::Subject;

/// Kind of backend serving a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Ollama,
    OpenAi,
    Anthropic,
}

/// Ordered question-complexity classification used to bias model
/// selection toward cheaper or more capable backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityTier {
    Simple,
    Moderate,
    Complex,
}

impl ComplexityTier {
    fn rank(self) -> i8 {
        match self {
            ComplexityTier::Simple => 0,
            ComplexityTier::Moderate => 1,
            ComplexityTier::Complex => 2,
        }
    }

    /// Ranking key for candidate ordering against a hinted tier:
    /// exact match first, then nearest lower, then nearest higher.
    pub fn match_rank(self, hint: ComplexityTier) -> (u8, u8) {
        let delta = self.rank() - hint.rank();
        match delta {
            0 => (0, 0),
            d if d < 0 => (1, (-d) as u8),
            d => (2, d as u8),
        }
    }
}

/// Static description of a backend model.
///
/// Immutable once loaded; the active set is swapped whole via
/// [`ModelRegistry::reload`](crate::registry::ModelRegistry::reload),
/// never mutated from request handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Registry id (e.g. "phi3-mini-educational").
    pub id: String,
    pub provider_kind: ProviderKind,
    /// Provider-side model name (e.g. "phi3:mini").
    pub model_name: String,
    /// Subjects this model is tuned for. Empty = general purpose,
    /// matches every subject.
    #[serde(default)]
    pub subject_affinity: Vec<Subject>,
    pub complexity_tier: ComplexityTier,
    pub cost_per_1k_tokens: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Per-call deadline for this model's backend.
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Retired models stay resolvable for reporting but are never
    /// selected, even by explicit preference.
    #[serde(default)]
    pub retired: bool,
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Serialize `Duration` as whole seconds in config files.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

impl ModelDescriptor {
    /// Whether this model is a candidate for the given subject.
    pub fn matches_subject(&self, subject: Subject) -> bool {
        self.subject_affinity.is_empty() || self.subject_affinity.contains(&subject)
    }

    /// Estimated cost in USD for a given token count.
    pub fn estimate_cost(&self, tokens: u32) -> f64 {
        self.cost_per_1k_tokens * f64::from(tokens) / 1000.0
    }
}
