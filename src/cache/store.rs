//! Answer cache with per-entry TTL and pattern invalidation.
//!
//! Built on moka's sync cache: lookups and inserts are lock-free per
//! key, so reads never block writes to other keys. TTL expiry is lazy —
//! moka treats an entry past its deadline as absent on read and reclaims
//! it opportunistically. Entries are never mutated in place; a
//! write-through after a backend call always inserts a fresh entry.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::notification::RemovalCause;
use moka::sync::Cache;

use crate::telemetry;

use super::fingerprint::Fingerprint;

/// Configuration for the answer cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 10,000.
    pub max_entries: u64,
    /// TTL applied to entries inserted without an explicit one.
    /// Default: 1 hour.
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            default_ttl: Duration::from_secs(3600),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the default time-to-live for cached entries.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
}

/// A cached answer. Created on cache miss after a successful backend
/// call; read-only until expiry or invalidation.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub answer: String,
    pub model_used: String,
    pub tokens_used: u32,
    pub cost_estimate: f64,
    pub confidence: f64,
    pub follow_up_suggestions: Vec<String>,
    pub learning_resources: Vec<String>,
    pub created_at: Instant,
    pub ttl: Duration,
}

/// Running cache counters, exposed read-only for statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: u64,
}

/// Per-entry TTL policy: each entry expires `entry.ttl` after creation.
struct EntryTtl;

impl Expiry<String, CacheEntry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-memory answer cache keyed by [`Fingerprint`].
pub struct AnswerCache {
    cache: Cache<String, CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: Arc<AtomicU64>,
}

impl AnswerCache {
    /// Create a new answer cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let evictions = Arc::new(AtomicU64::new(0));
        let listener_evictions = Arc::clone(&evictions);
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .expire_after(EntryTtl)
            .eviction_listener(move |_key, _value, cause| {
                // Explicit removals are operator invalidations, not evictions.
                if matches!(cause, RemovalCause::Expired | RemovalCause::Size) {
                    listener_evictions.fetch_add(1, Ordering::Relaxed);
                }
            })
            .build();
        Self {
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions,
        }
    }

    /// Look up a cached answer. An entry past its TTL reads as a miss.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<CacheEntry> {
        let subject = subject_label(fingerprint);
        match self.cache.get(fingerprint.as_str()) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "subject" => subject).increment(1);
                Some(entry)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "subject" => subject).increment(1);
                None
            }
        }
    }

    /// Insert an answer under its fingerprint. The entry carries its
    /// own TTL.
    pub fn put(&self, fingerprint: &Fingerprint, entry: CacheEntry) {
        self.cache.insert(fingerprint.as_str().to_owned(), entry);
    }

    /// Remove all entries whose fingerprint matches `pattern`, returning
    /// the count removed.
    ///
    /// A trailing `*` makes the pattern a prefix glob (`"math:*"`);
    /// otherwise it must match the full key.
    pub fn invalidate(&self, pattern: &str) -> usize {
        self.cache.run_pending_tasks();
        let keys: Vec<Arc<String>> = self
            .cache
            .iter()
            .filter(|(key, _)| matches_pattern(key, pattern))
            .map(|(key, _)| key)
            .collect();
        for key in &keys {
            self.cache.invalidate(key.as_str());
        }
        keys.len()
    }

    /// Current hit/miss/eviction counters and entry count.
    pub fn stats(&self) -> CacheStats {
        self.cache.run_pending_tasks();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.cache.entry_count(),
        }
    }
}

/// Subject prefix of a fingerprint, for metric labels.
fn subject_label(fingerprint: &Fingerprint) -> String {
    fingerprint
        .as_str()
        .split(':')
        .next()
        .unwrap_or("unknown")
        .to_owned()
}

/// Exact match, or prefix match when the pattern ends with `*`.
fn matches_pattern(key: &str, pattern: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}
