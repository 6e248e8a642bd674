//! Request fingerprinting and the answer cache.

mod fingerprint;
mod store;

pub use fingerprint::Fingerprint;
pub use store::{AnswerCache, CacheConfig, CacheEntry, CacheStats};
