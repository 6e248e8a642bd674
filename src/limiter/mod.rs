//! Per-identity sliding-window rate limiting.
//!
//! Each identity owns an ordered window of admission timestamps behind
//! its own mutex, so the check-then-record sequence is serialized per
//! identity while unrelated identities never contend. Windows live in a
//! moka cache with idle eviction, which bounds memory without explicit
//! cleanup of inactive identities.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use moka::sync::Cache;

use crate::telemetry;
use crate::types::Tier;

/// Quota and window length for one identity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    /// Maximum admissions inside a rolling window.
    pub quota: usize,
    /// Rolling window length.
    pub window: Duration,
}

impl TierLimits {
    pub fn new(quota: usize, window: Duration) -> Self {
        Self { quota, window }
    }
}

/// Per-tier rate limiting configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub anonymous: TierLimits,
    pub authenticated: TierLimits,
    /// Idle identities are evicted after this long without a call.
    pub idle_eviction: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            anonymous: TierLimits::new(5, Duration::from_secs(60)),
            authenticated: TierLimits::new(10, Duration::from_secs(60)),
            idle_eviction: Duration::from_secs(600),
        }
    }
}

impl RateLimitConfig {
    fn limits(&self, tier: Tier) -> TierLimits {
        match tier {
            Tier::Anonymous => self.anonymous,
            Tier::Authenticated => self.authenticated,
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Admitted; `remaining` slots left in the current window.
    Allowed { remaining: usize },
    /// Denied; retry once `retry_after` has elapsed.
    Denied { retry_after: Duration },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

type Window = Arc<Mutex<VecDeque<Instant>>>;

/// Sliding-window rate limiter.
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Cache<String, Window>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let windows = Cache::builder()
            .time_to_idle(config.idle_eviction)
            .build();
        Self { config, windows }
    }

    /// Check and record an admission for `identity` at the current time.
    pub fn admit(&self, identity: &str, tier: Tier) -> Decision {
        self.admit_at(identity, tier, Instant::now())
    }

    /// Check and record an admission at an explicit `now`.
    ///
    /// Timestamps older than `now - window` are trimmed lazily; the
    /// request is admitted iff fewer than `quota` remain, and `now` is
    /// recorded only on admission. Denied requests never count against
    /// the quota.
    pub fn admit_at(&self, identity: &str, tier: Tier, now: Instant) -> Decision {
        let limits = self.config.limits(tier);
        let window = self.window_for(identity);
        let mut timestamps = window.lock().expect("rate window lock poisoned");

        trim(&mut timestamps, now, limits.window);

        if timestamps.len() < limits.quota {
            timestamps.push_back(now);
            Decision::Allowed {
                remaining: limits.quota - timestamps.len(),
            }
        } else {
            // Oldest remaining timestamp leaves the window first.
            let oldest = *timestamps.front().expect("non-empty at quota");
            let retry_after = limits.window.saturating_sub(now.duration_since(oldest));
            metrics::counter!(telemetry::RATE_LIMITED_TOTAL).increment(1);
            Decision::Denied { retry_after }
        }
    }

    /// Remaining admissions for `identity` without recording one.
    pub fn remaining(&self, identity: &str, tier: Tier, now: Instant) -> usize {
        let limits = self.config.limits(tier);
        let window = self.window_for(identity);
        let mut timestamps = window.lock().expect("rate window lock poisoned");
        trim(&mut timestamps, now, limits.window);
        limits.quota.saturating_sub(timestamps.len())
    }

    /// Forget all recorded admissions for `identity`.
    pub fn reset(&self, identity: &str) {
        self.windows.invalidate(identity);
    }

    fn window_for(&self, identity: &str) -> Window {
        self.windows
            .get_with_by_ref(identity, || Arc::new(Mutex::new(VecDeque::new())))
    }
}

/// Drop timestamps that have aged out of the rolling window.
fn trim(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(front) = timestamps.front() {
        if now.duration_since(*front) >= window {
            timestamps.pop_front();
        } else {
            break;
        }
    }
}
