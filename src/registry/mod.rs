//! Model registry: the active set of backend models and the default
//! routing choice.
//!
//! The registry state is an immutable snapshot behind an `RwLock<Arc<_>>`.
//! Readers clone the `Arc` and see a consistent view; writers (explicit
//! `reload`, canary promotion via `set_default`) swap the whole snapshot.
//! Request handling never mutates registry state.

pub mod config;

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::types::{ComplexityTier, ModelDescriptor, Subject};
use crate::{MimirError, Result};

pub use config::RegistryConfig;

#[derive(Debug)]
struct Snapshot {
    models: BTreeMap<String, ModelDescriptor>,
    default_model: String,
}

/// Registry of known backend models with complexity/cost-aware
/// candidate resolution.
#[derive(Debug)]
pub struct ModelRegistry {
    inner: RwLock<Arc<Snapshot>>,
}

impl ModelRegistry {
    /// Build a registry from descriptors and a default model id.
    pub fn new(models: Vec<ModelDescriptor>, default_model: impl Into<String>) -> Result<Self> {
        let snapshot = Snapshot::build(models, default_model.into())?;
        Ok(Self {
            inner: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Replace the active model set. This is the only reload entry
    /// point; in-flight requests keep the snapshot they already read.
    pub fn reload(
        &self,
        models: Vec<ModelDescriptor>,
        default_model: impl Into<String>,
    ) -> Result<()> {
        let snapshot = Snapshot::build(models, default_model.into())?;
        *self.inner.write().expect("registry lock poisoned") = Arc::new(snapshot);
        Ok(())
    }

    /// Promote `model_id` to the unconditional default (canary success).
    pub fn set_default(&self, model_id: &str) -> Result<()> {
        let mut guard = self.inner.write().expect("registry lock poisoned");
        if !guard.models.contains_key(model_id) {
            return Err(MimirError::ModelNotFound(model_id.to_owned()));
        }
        *guard = Arc::new(Snapshot {
            models: guard.models.clone(),
            default_model: model_id.to_owned(),
        });
        Ok(())
    }

    /// Look up a descriptor by id.
    pub fn get(&self, model_id: &str) -> Option<ModelDescriptor> {
        self.snapshot().models.get(model_id).cloned()
    }

    /// The current default model id.
    pub fn default_model(&self) -> String {
        self.snapshot().default_model.clone()
    }

    /// All configured model ids, sorted.
    pub fn model_ids(&self) -> Vec<String> {
        self.snapshot().models.keys().cloned().collect()
    }

    /// Whether `model_id` names a known, non-retired model.
    pub fn is_routable(&self, model_id: &str) -> bool {
        self.snapshot()
            .models
            .get(model_id)
            .is_some_and(|m| !m.retired)
    }

    /// Resolve an ordered candidate list for a request.
    ///
    /// An explicit preference naming a known, non-retired model is the
    /// sole candidate. Otherwise candidates are filtered by subject
    /// affinity and ranked by complexity-tier match (exact, nearest
    /// lower, nearest higher), then cost, then configured timeout, with
    /// a stable tie-break on model id. If nothing matches the subject,
    /// the default model is the sole candidate.
    pub fn resolve(
        &self,
        subject: Subject,
        complexity_hint: ComplexityTier,
        explicit_preference: Option<&str>,
    ) -> Vec<ModelDescriptor> {
        let snapshot = self.snapshot();

        if let Some(preferred) = explicit_preference
            && let Some(model) = snapshot.models.get(preferred)
            && !model.retired
        {
            return vec![model.clone()];
        }

        let mut candidates: Vec<ModelDescriptor> = snapshot
            .models
            .values()
            .filter(|m| !m.retired && m.matches_subject(subject))
            .cloned()
            .collect();

        candidates.sort_by(|a, b| {
            a.complexity_tier
                .match_rank(complexity_hint)
                .cmp(&b.complexity_tier.match_rank(complexity_hint))
                .then(a.cost_per_1k_tokens.total_cmp(&b.cost_per_1k_tokens))
                .then(a.timeout.cmp(&b.timeout))
                .then(a.id.cmp(&b.id))
        });

        if candidates.is_empty()
            && let Some(default) = snapshot.models.get(&snapshot.default_model)
            && !default.retired
        {
            candidates.push(default.clone());
        }

        candidates
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.inner.read().expect("registry lock poisoned"))
    }
}

impl Snapshot {
    fn build(models: Vec<ModelDescriptor>, default_model: String) -> Result<Self> {
        let mut map = BTreeMap::new();
        for model in models {
            if map.insert(model.id.clone(), model).is_some() {
                return Err(MimirError::Configuration(
                    "duplicate model id in registry".to_owned(),
                ));
            }
        }
        if !map.contains_key(&default_model) {
            return Err(MimirError::ModelNotFound(default_model));
        }
        Ok(Self {
            models: map,
            default_model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::types::ProviderKind;

    fn model(id: &str, tier: ComplexityTier, cost: f64) -> ModelDescriptor {
        ModelDescriptor {
            id: id.to_owned(),
            provider_kind: ProviderKind::Ollama,
            model_name: id.to_owned(),
            subject_affinity: vec![],
            complexity_tier: tier,
            cost_per_1k_tokens: cost,
            max_tokens: 1024,
            temperature: 0.7,
            timeout: Duration::from_secs(30),
            system_prompt: None,
            retired: false,
        }
    }

    #[test]
    fn default_must_exist() {
        let err = ModelRegistry::new(vec![model("a", ComplexityTier::Simple, 0.1)], "missing");
        assert!(matches!(err, Err(MimirError::ModelNotFound(_))));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let err = ModelRegistry::new(
            vec![
                model("a", ComplexityTier::Simple, 0.1),
                model("a", ComplexityTier::Complex, 0.2),
            ],
            "a",
        );
        assert!(matches!(err, Err(MimirError::Configuration(_))));
    }

    #[test]
    fn explicit_preference_is_sole_candidate() {
        let registry = ModelRegistry::new(
            vec![
                model("cheap", ComplexityTier::Simple, 0.1),
                model("big", ComplexityTier::Complex, 0.9),
            ],
            "cheap",
        )
        .unwrap();
        let candidates = registry.resolve(Subject::Math, ComplexityTier::Simple, Some("big"));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "big");
    }

    #[test]
    fn retired_preference_falls_back_to_ranking() {
        let mut retired = model("old", ComplexityTier::Simple, 0.1);
        retired.retired = true;
        let registry = ModelRegistry::new(
            vec![retired, model("new", ComplexityTier::Simple, 0.2)],
            "new",
        )
        .unwrap();
        let candidates = registry.resolve(Subject::Math, ComplexityTier::Simple, Some("old"));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "new");
    }

    #[test]
    fn ranking_exact_tier_then_cost() {
        let registry = ModelRegistry::new(
            vec![
                model("pricey-exact", ComplexityTier::Moderate, 0.9),
                model("cheap-exact", ComplexityTier::Moderate, 0.1),
                model("lower", ComplexityTier::Simple, 0.05),
                model("higher", ComplexityTier::Complex, 0.05),
            ],
            "cheap-exact",
        )
        .unwrap();
        let ids: Vec<_> = registry
            .resolve(Subject::Math, ComplexityTier::Moderate, None)
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, ["cheap-exact", "pricey-exact", "lower", "higher"]);
    }

    #[test]
    fn subject_affinity_filters_candidates() {
        let mut math_only = model("math-tutor", ComplexityTier::Simple, 0.1);
        math_only.subject_affinity = vec![Subject::Math];
        let registry = ModelRegistry::new(
            vec![math_only, model("general", ComplexityTier::Simple, 0.2)],
            "general",
        )
        .unwrap();

        let math = registry.resolve(Subject::Math, ComplexityTier::Simple, None);
        assert_eq!(math[0].id, "math-tutor");

        let history = registry.resolve(Subject::History, ComplexityTier::Simple, None);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, "general");
    }

    #[test]
    fn no_subject_match_falls_back_to_default() {
        let mut math_only = model("math-tutor", ComplexityTier::Simple, 0.1);
        math_only.subject_affinity = vec![Subject::Math];
        let mut science_only = model("science-tutor", ComplexityTier::Simple, 0.1);
        science_only.subject_affinity = vec![Subject::Science];
        let registry =
            ModelRegistry::new(vec![math_only, science_only], "math-tutor").unwrap();

        let candidates = registry.resolve(Subject::History, ComplexityTier::Simple, None);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "math-tutor");
    }

    #[test]
    fn reload_swaps_the_whole_set() {
        let registry =
            ModelRegistry::new(vec![model("a", ComplexityTier::Simple, 0.1)], "a").unwrap();
        registry
            .reload(vec![model("b", ComplexityTier::Simple, 0.1)], "b")
            .unwrap();
        assert!(registry.get("a").is_none());
        assert_eq!(registry.default_model(), "b");
    }

    #[test]
    fn set_default_requires_known_model() {
        let registry =
            ModelRegistry::new(vec![model("a", ComplexityTier::Simple, 0.1)], "a").unwrap();
        assert!(registry.set_default("nope").is_err());
        let registry = ModelRegistry::new(
            vec![
                model("a", ComplexityTier::Simple, 0.1),
                model("b", ComplexityTier::Simple, 0.1),
            ],
            "a",
        )
        .unwrap();
        registry.set_default("b").unwrap();
        assert_eq!(registry.default_model(), "b");
    }
}
