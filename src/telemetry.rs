//! Telemetry metric name constants.
//!
//! Centralised metric names for mimir operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `mimir_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `model` — model id (e.g. "phi3-mini")
//! - `subject` — academic subject of the request
//! - `status` — outcome: "ok" or "error"

/// Total requests handled by the gateway.
///
/// Labels: `model`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "mimir_requests_total";

/// Backend call duration in seconds.
///
/// Labels: `model`.
pub const BACKEND_DURATION_SECONDS: &str = "mimir_backend_duration_seconds";

/// Total answer cache hits.
///
/// Labels: `subject`.
pub const CACHE_HITS_TOTAL: &str = "mimir_cache_hits_total";

/// Total answer cache misses.
///
/// Labels: `subject`.
pub const CACHE_MISSES_TOTAL: &str = "mimir_cache_misses_total";

/// Total requests denied by the rate limiter.
pub const RATE_LIMITED_TOTAL: &str = "mimir_rate_limited_total";

/// Total backend retries against an alternate candidate.
///
/// Labels: `model` (the model that failed).
pub const FALLBACK_TOTAL: &str = "mimir_fallback_total";

/// Total tokens consumed across backend calls.
///
/// Labels: `model`.
pub const TOKENS_TOTAL: &str = "mimir_tokens_total";

/// Canary percentage steps taken (advance decisions).
pub const CANARY_STEPS_TOTAL: &str = "mimir_canary_steps_total";

/// Canary rollbacks triggered by health violations.
pub const CANARY_ROLLBACKS_TOTAL: &str = "mimir_canary_rollbacks_total";
