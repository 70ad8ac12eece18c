//! Least Recently Used eviction.

use super::{validate_capacity, CacheEntry, CachePolicy, CacheStats, CacheStrategy, Counters};
use crate::error::{OrbitalError, Result};
use crate::types::{ContentId, ContentItem};
use ::lru::LruCache;
use std::sync::Arc;

/// LRU cache: a `get` hit or an update moves the entry to the most recent
/// position, and the least recent entry is evicted when full.
pub struct LruPolicy {
    /// Entries ordered by recency.
    entries: LruCache<ContentId, CacheEntry>,
    capacity: usize,
    counters: Counters,
    /// Logical clock, advanced by every `get` and `put`.
    tick: u64,
}

impl LruPolicy {
    /// Create a new LRU cache holding at most `capacity` items.
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = validate_capacity(capacity)?;
        Ok(Self {
            entries: LruCache::new(capacity),
            capacity: capacity.get(),
            counters: Counters::default(),
            tick: 0,
        })
    }

    /// Number of accesses recorded for a cached item.
    pub fn access_count(&self, content_id: &str) -> Option<u64> {
        self.entries.peek(content_id).map(|e| e.access_count)
    }
}

impl CachePolicy for LruPolicy {
    fn get(&mut self, content_id: &str) -> Option<Arc<ContentItem>> {
        self.tick += 1;
        // get_mut promotes the entry to most recently used
        match self.entries.get_mut(content_id) {
            Some(entry) => {
                entry.touch(self.tick);
                self.counters.hits += 1;
                Some(Arc::clone(&entry.item))
            }
            None => {
                self.counters.misses += 1;
                None
            }
        }
    }

    fn put(&mut self, content_id: &str, item: Arc<ContentItem>) -> Result<Option<ContentId>> {
        self.tick += 1;
        if let Some(entry) = self.entries.get_mut(content_id) {
            entry.item = item;
            entry.last_access = self.tick;
            return Ok(None);
        }

        let mut evicted = None;
        if self.entries.len() >= self.capacity {
            let (victim, entry) = self.entries.pop_lru().ok_or_else(|| {
                OrbitalError::InvariantViolation("LRU cache full but has no victim".to_string())
            })?;
            entry.trace_eviction(CacheStrategy::Lru, &victim, self.tick);
            self.counters.evictions += 1;
            evicted = Some(victim);
        }

        self.entries.put(content_id.to_string(), CacheEntry::new(item, self.tick));
        Ok(evicted)
    }

    fn contains(&self, content_id: &str) -> bool {
        self.entries.contains(content_id)
    }

    fn stats(&self) -> CacheStats {
        self.counters
            .snapshot(CacheStrategy::Lru, self.entries.len(), self.capacity)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn keys(&self) -> Vec<ContentId> {
        // iter() runs from most to least recent
        self.entries.iter().rev().map(|(k, _)| k.clone()).collect()
    }

    fn strategy(&self) -> CacheStrategy {
        CacheStrategy::Lru
    }
}
