//! Tests for the fingerprinted answer cache: TTL expiry, pattern
//! invalidation, and statistics.

use std::time::{Duration, Instant};

use mimir::{AnswerCache, AskRequest, CacheConfig, CacheEntry, Fingerprint, GradeLevel, Subject};

// ============================================================================
// Helpers
// ============================================================================

fn entry(answer: &str, ttl: Duration) -> CacheEntry {
    CacheEntry {
        answer: answer.to_owned(),
        model_used: "phi3-mini".to_owned(),
        tokens_used: 42,
        cost_estimate: 0.0001,
        confidence: 0.8,
        follow_up_suggestions: vec![],
        learning_resources: vec![],
        created_at: Instant::now(),
        ttl,
    }
}

fn fingerprint(question: &str, subject: Subject) -> Fingerprint {
    let request = AskRequest::new("s1", question, subject, GradeLevel::HighSchool);
    Fingerprint::compute(&request, "phi3-mini")
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn put_then_get_returns_entry() {
    let cache = AnswerCache::new(&CacheConfig::default());
    let fp = fingerprint("What is a derivative?", Subject::Math);

    cache.put(&fp, entry("the slope of a tangent line", Duration::from_secs(60)));
    let got = cache.get(&fp).expect("entry should be cached");
    assert_eq!(got.answer, "the slope of a tangent line");
    assert_eq!(got.model_used, "phi3-mini");
}

#[test]
fn entries_expire_after_their_ttl() {
    let cache = AnswerCache::new(&CacheConfig::default());
    let fp = fingerprint("ephemeral", Subject::Math);

    cache.put(&fp, entry("short-lived", Duration::from_millis(50)));
    assert!(cache.get(&fp).is_some());

    std::thread::sleep(Duration::from_millis(120));
    assert!(cache.get(&fp).is_none(), "entry should have expired");

    let stats = cache.stats();
    assert_eq!(stats.evictions, 1, "expiry should count as an eviction");
}

#[test]
fn expired_entry_reads_as_miss() {
    let cache = AnswerCache::new(&CacheConfig::default());
    let fp = fingerprint("gone", Subject::Science);

    cache.put(&fp, entry("x", Duration::from_millis(30)));
    std::thread::sleep(Duration::from_millis(80));

    assert!(cache.get(&fp).is_none());
    let stats = cache.stats();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 1);
}

#[test]
fn pattern_invalidation_removes_only_matches() {
    let cache = AnswerCache::new(&CacheConfig::default());
    let ttl = Duration::from_secs(60);

    let math_a = fingerprint("What is a derivative?", Subject::Math);
    let math_b = fingerprint("What is an integral?", Subject::Math);
    let science = fingerprint("What is photosynthesis?", Subject::Science);
    cache.put(&math_a, entry("a", ttl));
    cache.put(&math_b, entry("b", ttl));
    cache.put(&science, entry("c", ttl));

    let removed = cache.invalidate("math:*");
    assert_eq!(removed, 2);

    assert!(cache.get(&math_a).is_none());
    assert!(cache.get(&math_b).is_none());
    assert!(cache.get(&science).is_some(), "other subjects must survive");
}

#[test]
fn exact_pattern_invalidates_single_entry() {
    let cache = AnswerCache::new(&CacheConfig::default());
    let ttl = Duration::from_secs(60);

    let a = fingerprint("q one", Subject::Math);
    let b = fingerprint("q two", Subject::Math);
    cache.put(&a, entry("a", ttl));
    cache.put(&b, entry("b", ttl));

    assert_eq!(cache.invalidate(a.as_str()), 1);
    assert!(cache.get(&a).is_none());
    assert!(cache.get(&b).is_some());
}

#[test]
fn invalidation_does_not_count_as_eviction() {
    let cache = AnswerCache::new(&CacheConfig::default());
    let fp = fingerprint("operator removal", Subject::Math);
    cache.put(&fp, entry("a", Duration::from_secs(60)));

    cache.invalidate("math:*");
    let stats = cache.stats();
    assert_eq!(stats.evictions, 0);
}

#[test]
fn invalidating_nothing_returns_zero() {
    let cache = AnswerCache::new(&CacheConfig::default());
    assert_eq!(cache.invalidate("history:*"), 0);
}

#[test]
fn stats_track_hits_misses_and_size() {
    let cache = AnswerCache::new(&CacheConfig::default());
    let fp = fingerprint("counted", Subject::Math);

    assert!(cache.get(&fp).is_none());
    cache.put(&fp, entry("a", Duration::from_secs(60)));
    assert!(cache.get(&fp).is_some());
    assert!(cache.get(&fp).is_some());

    let stats = cache.stats();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.size, 1);
}

#[test]
fn capacity_is_bounded() {
    let cache = AnswerCache::new(&CacheConfig::new().max_entries(8));
    for i in 0..64 {
        let fp = fingerprint(&format!("question number {i}"), Subject::Math);
        cache.put(&fp, entry("a", Duration::from_secs(60)));
    }
    let stats = cache.stats();
    assert!(stats.size <= 8, "size {} exceeds capacity", stats.size);
}
