//! Stable request fingerprints used as cache keys.
//!
//! A fingerprint is `{subject}:{grade}:{model}:{hash}` where `hash` is
//! the first 16 hex chars of a SHA-256 over the normalized question and
//! the trailing conversation turns. The textual prefix makes pattern
//! invalidation (`"math:*"`) cheap; the hash keeps the key bounded and
//! stable across processes, unlike `DefaultHasher`.

use sha2::{Digest, Sha256};

use crate::types::AskRequest;

/// Conversation turns that participate in the fingerprint. Older turns
/// don't change the answer enough to justify cache fragmentation.
const FINGERPRINT_HISTORY_TURNS: usize = 5;

/// Hex chars of the content hash kept in the key.
const HASH_PREFIX_LEN: usize = 16;

/// A deterministic cache key for a teaching request.
///
/// Identical semantic inputs (subject, grade level, normalized question,
/// trailing turns, model) always produce the identical fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint for a request routed at `model_id`.
    pub fn compute(request: &AskRequest, model_id: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(normalize(&request.question));
        let skip = request
            .conversation_history
            .len()
            .saturating_sub(FINGERPRINT_HISTORY_TURNS);
        for turn in &request.conversation_history[skip..] {
            hasher.update(b"\x1f");
            hasher.update(turn.role.as_bytes());
            hasher.update(b"\x1f");
            hasher.update(normalize(&turn.content));
        }
        let digest = hex::encode(hasher.finalize());

        Self(format!(
            "{}:{}:{}:{}",
            request.subject,
            request.grade_level,
            model_id,
            &digest[..HASH_PREFIX_LEN],
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize question text: trim, lowercase, collapse internal
/// whitespace runs to single spaces.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
