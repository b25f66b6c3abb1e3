//! Bounded, TTL'd cache of intent classifications.
//!
//! Keys are SHA-256 digests of the lower-cased, trimmed prompt. Expired
//! entries are treated as misses and only replaced on the next insert; when
//! the cache is full the single oldest entry is evicted first.

use cortex_core::IgnoreRwLock as _;
use sha2::{Digest as _, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::types::IntentResult;

#[derive(Debug, Clone)]
struct CacheEntry {
    result: IntentResult,
    inserted_at: Instant,
}

/// Thread-safe intent cache owned by one analyzer.
#[derive(Debug)]
pub struct IntentCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    max_size: usize,
    ttl: Duration,
}

impl IntentCache {
    /// Creates an empty cache; a `max_size` of zero is raised to one.
    #[must_use]
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_size: max_size.max(1),
            ttl,
        }
    }

    /// Cache key for `prompt`: hex SHA-256 of the normalized text.
    #[must_use]
    pub fn key_for(prompt: &str) -> String {
        let normalized = prompt.trim().to_lowercase();
        format!("{:x}", Sha256::digest(normalized.as_bytes()))
    }

    /// Returns the cached result for `key` if it is younger than the TTL.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<IntentResult> {
        let entries = self.entries.read_ignore_poison();
        let entry = entries.get(key)?;
        (entry.inserted_at.elapsed() <= self.ttl).then(|| entry.result.clone())
    }

    /// Stores `result`, evicting the oldest entry when the cache is full.
    pub fn insert(&self, key: String, result: IntentResult) {
        let mut entries = self.entries.write_ignore_poison();
        if !entries.contains_key(&key) && entries.len() >= self.max_size {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(oldest_key, _)| oldest_key.clone());
            if let Some(oldest_key) = oldest {
                entries.remove(&oldest_key);
            }
        }
        entries.insert(
            key,
            CacheEntry {
                result,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Number of stored entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read_ignore_poison().len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read_ignore_poison().is_empty()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.write_ignore_poison().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IntentType;
    use std::thread;

    fn result(intent: IntentType) -> IntentResult {
        IntentResult::new(intent, 0.8)
    }

    #[test]
    fn test_key_normalizes_case_and_whitespace() {
        assert_eq!(
            IntentCache::key_for("  Hello World \n"),
            IntentCache::key_for("hello world")
        );
        assert_ne!(IntentCache::key_for("hello"), IntentCache::key_for("hello!"));
        assert_eq!(IntentCache::key_for("x").len(), 64);
    }

    #[test]
    fn test_capacity_bounds_entries() {
        let cache = IntentCache::new(2, Duration::from_secs(60));
        for prompt in ["one", "two", "three"] {
            cache.insert(IntentCache::key_for(prompt), result(IntentType::Factual));
        }
        assert!(cache.len() <= 2);
    }

    #[test]
    fn test_evicts_oldest_entry() {
        let cache = IntentCache::new(2, Duration::from_secs(60));
        cache.insert("first".to_owned(), result(IntentType::Factual));
        thread::sleep(Duration::from_millis(2));
        cache.insert("second".to_owned(), result(IntentType::Creative));
        thread::sleep(Duration::from_millis(2));
        cache.insert("third".to_owned(), result(IntentType::Conversation));

        assert!(cache.get("first").is_none());
        assert_eq!(cache.get("second").map(|hit| hit.primary), Some(IntentType::Creative));
        assert_eq!(
            cache.get("third").map(|hit| hit.primary),
            Some(IntentType::Conversation)
        );
    }

    #[test]
    fn test_reinsert_existing_key_does_not_evict() {
        let cache = IntentCache::new(2, Duration::from_secs(60));
        cache.insert("a".to_owned(), result(IntentType::Factual));
        cache.insert("b".to_owned(), result(IntentType::Factual));
        cache.insert("a".to_owned(), result(IntentType::Creative));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = IntentCache::new(10, Duration::from_millis(1));
        cache.insert("prompt".to_owned(), result(IntentType::Factual));
        thread::sleep(Duration::from_millis(10));
        assert!(cache.get("prompt").is_none());
        // not swept, only ignored
        assert_eq!(cache.len(), 1);
    }
}
