//! Cached totals for unfiltered listings.
//!
//! Counting a large library is the most expensive part of serving its first
//! page, and the unfiltered total for a user who can see everything only
//! changes when items are added or removed. The cache is only consulted for
//! that shape; writers call the `invalidate*` methods after changing the
//! catalog. A stale count is tolerated until then.

use dashmap::DashMap;
use tome_catalog::models::MediaType;
use tracing::{debug, info};

/// The canonical shape of a cacheable listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CountKey {
    pub library_id: String,
    pub media_type: MediaType,
}

impl CountKey {
    pub fn new(library_id: impl Into<String>, media_type: MediaType) -> Self {
        Self { library_id: library_id.into(), media_type }
    }
}

/// Concurrent map of listing totals, shared between request handlers.
#[derive(Debug, Default)]
pub struct CountCache {
    counts: DashMap<CountKey, u64>,
}

impl CountCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CountKey) -> Option<u64> {
        let count = self.counts.get(key).map(|entry| *entry.value());
        debug!(library_id = %key.library_id, hit = count.is_some(), "count cache lookup");
        count
    }

    pub fn insert(&self, key: CountKey, count: u64) {
        self.counts.insert(key, count);
    }

    pub fn invalidate(&self, key: &CountKey) {
        if self.counts.remove(key).is_some() {
            info!(library_id = %key.library_id, media_type = %key.media_type, "invalidated cached count");
        }
    }

    /// Drop every cached count for a library.
    pub fn invalidate_library(&self, library_id: &str) {
        self.counts.retain(|key, _| key.library_id != library_id);
        info!(library_id, "invalidated cached counts for library");
    }

    pub fn clear(&self) {
        self.counts.clear();
        info!("cleared count cache");
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let cache = CountCache::new();
        let key = CountKey::new("lib", MediaType::Book);
        assert_eq!(cache.get(&key), None);
        cache.insert(key.clone(), 42);
        assert_eq!(cache.get(&key), Some(42));
        assert_eq!(cache.get(&CountKey::new("lib", MediaType::Podcast)), None);
    }

    #[test]
    fn test_invalidate() {
        let cache = CountCache::new();
        let key = CountKey::new("lib", MediaType::Book);
        cache.insert(key.clone(), 1);
        cache.invalidate(&key);
        assert!(cache.is_empty());
        // Invalidating an absent key is a no-op.
        cache.invalidate(&key);
    }

    #[test]
    fn test_invalidate_library() {
        let cache = CountCache::new();
        cache.insert(CountKey::new("a", MediaType::Book), 1);
        cache.insert(CountKey::new("a", MediaType::Podcast), 2);
        cache.insert(CountKey::new("b", MediaType::Book), 3);
        cache.invalidate_library("a");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&CountKey::new("b", MediaType::Book)), Some(3));
        cache.clear();
        assert!(cache.is_empty());
    }
}
