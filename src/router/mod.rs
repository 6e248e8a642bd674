//! The gateway: request orchestration across cache, rate limiter,
//! model registry, canary controller, and backend.
//!
//! The hot path is [`Mimir::ask`]: fingerprint, cache lookup, rate
//! admission, model resolution, canary split, one bounded backend call
//! with a single retry against the next-ranked candidate, then
//! post-processing and write-through caching.

mod builder;
mod pedagogy;

pub use builder::MimirBuilder;

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use rand::Rng;
use tracing::{debug, instrument, warn};

use crate::cache::{AnswerCache, CacheEntry, CacheStats, Fingerprint};
use crate::canary::{CanaryController, CanaryState, MigrationSpec};
use crate::limiter::{Decision, RateLimiter};
use crate::registry::ModelRegistry;
use crate::telemetry;
use crate::traits::{Backend, Generation, UsageRecord, UsageStore};
use crate::types::{AskRequest, AskResponse, ModelDescriptor, ResponseSource};
use crate::{MimirError, Result};

/// Educational LLM gateway.
///
/// Routes each student question to the cheapest adequate model, caches
/// answers by semantic fingerprint, enforces per-identity rate limits,
/// and shifts traffic gradually during model migrations.
pub struct Mimir {
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) registry: Arc<ModelRegistry>,
    pub(crate) cache: AnswerCache,
    pub(crate) limiter: RateLimiter,
    pub(crate) canary: CanaryController,
    pub(crate) usage_store: Option<Arc<dyn UsageStore>>,
    pub(crate) default_ttl: std::time::Duration,
}

impl Mimir {
    /// Create a new builder for configuring the gateway.
    pub fn builder() -> MimirBuilder {
        MimirBuilder::new()
    }

    /// Answer a student question.
    ///
    /// Cache hits return without touching the rate limiter or backend.
    /// On a miss the request is admitted, routed, and served with at
    /// most one retry against the next-ranked candidate; the answer is
    /// written through to the cache.
    #[instrument(skip(self, request), fields(student = %request.student_id, subject = %request.subject))]
    pub async fn ask(&self, request: &AskRequest) -> Result<AskResponse> {
        let start = Instant::now();

        let fingerprint_model = request.model_preference.as_deref().unwrap_or("default");
        let fingerprint = Fingerprint::compute(request, fingerprint_model);

        if let Some(entry) = self.cache.get(&fingerprint) {
            debug!(fingerprint = %fingerprint, "cache hit");
            return Ok(Self::from_cache(entry, start));
        }

        match self.limiter.admit(&request.student_id, request.tier) {
            Decision::Allowed { remaining } => {
                debug!(remaining, "request admitted");
            }
            Decision::Denied { retry_after } => {
                return Err(MimirError::RateLimited { retry_after });
            }
        }

        let candidates = self.registry.resolve(
            request.subject,
            request.complexity_hint(),
            request.model_preference.as_deref(),
        );
        let Some(ranked_first) = candidates.first() else {
            return Err(MimirError::ModelNotFound(format!(
                "no routable model for subject '{}'",
                request.subject
            )));
        };

        let primary = self.apply_split(ranked_first);
        let prompt = pedagogy::build_prompt(request);

        match self.attempt(&primary, &prompt).await {
            Ok(generation) => {
                self.finish(request, &fingerprint, &primary, generation, start)
                    .await
            }
            Err(err) if err.is_backend_failure() => {
                counter!(telemetry::FALLBACK_TOTAL, "model" => primary.id.clone()).increment(1);
                warn!(model = %primary.id, error = %err, "backend failed, trying alternate");

                let Some(alternate) = candidates.iter().find(|c| c.id != primary.id) else {
                    return Err(MimirError::UpstreamUnavailable {
                        model: primary.id.clone(),
                        reason: err.to_string(),
                    });
                };
                match self.attempt(alternate, &prompt).await {
                    Ok(generation) => {
                        self.finish(request, &fingerprint, alternate, generation, start)
                            .await
                    }
                    Err(retry_err) => Err(MimirError::UpstreamUnavailable {
                        model: alternate.id.clone(),
                        reason: retry_err.to_string(),
                    }),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Begin a canary migration between two models.
    pub fn start_migration(&self, spec: MigrationSpec) -> Result<()> {
        self.canary.start_migration(spec)
    }

    /// Abort the active migration, routing all traffic back to the old
    /// model.
    pub fn abort_migration(&self) -> Result<CanaryState> {
        self.canary.abort()
    }

    /// Snapshot of the active (or most recent non-terminal) migration.
    pub fn migration_status(&self) -> Result<CanaryState> {
        self.canary.status()
    }

    /// Invalidate cached answers whose key matches `pattern`
    /// (a literal key or a trailing-`*` prefix glob). Returns the
    /// number of entries removed.
    pub fn invalidate_cache(&self, pattern: &str) -> usize {
        self.cache.invalidate(pattern)
    }

    /// Running cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Atomically replace the model catalog.
    pub fn reload_models(
        &self,
        models: Vec<ModelDescriptor>,
        default_model: impl Into<String>,
    ) -> Result<()> {
        self.registry.reload(models, default_model)
    }

    /// The model registry backing this gateway.
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// The canary controller backing this gateway.
    pub fn canary(&self) -> &CanaryController {
        &self.canary
    }

    /// Swap the ranked-first model for the migration target when a
    /// traffic split is live and the draw lands inside it.
    fn apply_split(&self, ranked_first: &ModelDescriptor) -> ModelDescriptor {
        if let Some(split) = self.canary.current_split() {
            if split.from_model == ranked_first.id {
                let draw: f64 = rand::thread_rng().gen_range(0.0..100.0);
                if draw < split.percentage {
                    if let Some(target) = self.registry.get(&split.to_model) {
                        debug!(from = %split.from_model, to = %split.to_model,
                               percentage = split.percentage, "canary split applied");
                        return target;
                    }
                }
            }
        }
        ranked_first.clone()
    }

    /// One bounded backend call. Every attempt, success or failure,
    /// feeds the canary health window for that model.
    async fn attempt(&self, model: &ModelDescriptor, prompt: &str) -> Result<Generation> {
        let call_start = Instant::now();
        let outcome = tokio::time::timeout(model.timeout, self.backend.generate(model, prompt))
            .await
            .unwrap_or(Err(MimirError::Timeout {
                model: model.id.clone(),
            }));
        let latency = call_start.elapsed();

        histogram!(telemetry::BACKEND_DURATION_SECONDS, "model" => model.id.clone())
            .record(latency.as_secs_f64());
        let status = if outcome.is_ok() { "ok" } else { "error" };
        counter!(telemetry::REQUESTS_TOTAL, "model" => model.id.clone(), "status" => status)
            .increment(1);

        self.canary
            .record_sample(&model.id, outcome.is_ok(), latency);
        outcome
    }

    /// Post-process a successful generation, write it through to the
    /// cache, and record usage.
    async fn finish(
        &self,
        request: &AskRequest,
        fingerprint: &Fingerprint,
        model: &ModelDescriptor,
        generation: Generation,
        start: Instant,
    ) -> Result<AskResponse> {
        let answer = pedagogy::post_process(&generation.text);
        if answer.is_empty() {
            return Err(MimirError::EmptyResponse);
        }

        let confidence = pedagogy::confidence(&generation);
        let follow_up_suggestions = pedagogy::follow_up_suggestions(request.subject);
        let learning_resources = pedagogy::learning_resources(request.subject);
        let estimated_cost = model.estimate_cost(generation.tokens_used);

        counter!(telemetry::TOKENS_TOTAL, "model" => model.id.clone())
            .increment(u64::from(generation.tokens_used));

        self.cache.put(
            fingerprint,
            CacheEntry {
                answer: answer.clone(),
                model_used: model.id.clone(),
                tokens_used: generation.tokens_used,
                cost_estimate: estimated_cost,
                confidence,
                follow_up_suggestions: follow_up_suggestions.clone(),
                learning_resources: learning_resources.clone(),
                created_at: Instant::now(),
                ttl: self.default_ttl,
            },
        );

        if let Some(store) = &self.usage_store {
            let record = UsageRecord {
                student_id: request.student_id.clone(),
                model_id: model.id.clone(),
                tokens_used: generation.tokens_used,
                cost: estimated_cost,
            };
            if let Err(err) = store.record_usage(record).await {
                warn!(error = %err, "usage store write failed");
            }
        }

        Ok(AskResponse {
            answer,
            model_used: model.id.clone(),
            tokens_used: generation.tokens_used,
            estimated_cost,
            confidence,
            source: ResponseSource::Llm,
            processing_time_ms: start.elapsed().as_millis() as u64,
            follow_up_suggestions,
            learning_resources,
        })
    }

    fn from_cache(entry: CacheEntry, start: Instant) -> AskResponse {
        AskResponse {
            answer: entry.answer,
            model_used: entry.model_used,
            tokens_used: entry.tokens_used,
            estimated_cost: entry.cost_estimate,
            confidence: entry.confidence,
            source: ResponseSource::Cache,
            processing_time_ms: start.elapsed().as_millis() as u64,
            follow_up_suggestions: entry.follow_up_suggestions,
            learning_resources: entry.learning_resources,
        }
    }
}
