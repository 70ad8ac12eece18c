//! Least Frequently Used eviction.
//!
//! Entries are grouped in frequency buckets. Each bucket keeps its members in
//! recency order (an unbounded `LruCache` used as an ordered set), so the
//! victim is the least recently touched member of the lowest-frequency bucket.
//! `min_frequency` points at that bucket: it is reset to 1 on every fresh
//! insertion, advanced when a hit empties the minimum bucket, and corrected
//! forward at eviction time if it points at an empty bucket.

use super::{validate_capacity, CacheEntry, CachePolicy, CacheStats, CacheStrategy, Counters};
use crate::error::{OrbitalError, Result};
use crate::types::{ContentId, ContentItem};
use ::lru::LruCache;
use std::collections::HashMap;
use std::sync::Arc;

type Bucket = LruCache<ContentId, ()>;

/// LFU cache with per-frequency LRU tie-breaking.
pub struct LfuPolicy {
    entries: HashMap<ContentId, CacheEntry>,
    /// Access count -> ids with that count, least recent first.
    buckets: HashMap<u64, Bucket>,
    min_frequency: u64,
    max_frequency: u64,
    capacity: usize,
    counters: Counters,
    /// Logical clock, advanced by every `get` and `put`.
    tick: u64,
}

impl LfuPolicy {
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = validate_capacity(capacity)?.get();
        Ok(Self {
            entries: HashMap::with_capacity(capacity),
            buckets: HashMap::new(),
            min_frequency: 0,
            max_frequency: 0,
            capacity,
            counters: Counters::default(),
            tick: 0,
        })
    }

    /// Access count of a cached item.
    pub fn frequency(&self, content_id: &str) -> Option<u64> {
        self.entries.get(content_id).map(|e| e.access_count)
    }

    fn bucket_mut(&mut self, frequency: u64) -> &mut Bucket {
        self.buckets
            .entry(frequency)
            .or_insert_with(LruCache::unbounded)
    }

    /// Moves an id from its old bucket into the next one up.
    fn promote(&mut self, content_id: &str, old_frequency: u64) {
        if let Some(bucket) = self.buckets.get_mut(&old_frequency) {
            bucket.pop(content_id);
            if bucket.is_empty() {
                self.buckets.remove(&old_frequency);
                if old_frequency == self.min_frequency {
                    self.min_frequency += 1;
                }
            }
        }

        let new_frequency = old_frequency + 1;
        self.max_frequency = self.max_frequency.max(new_frequency);
        self.bucket_mut(new_frequency).put(content_id.to_string(), ());
    }

    fn evict(&mut self) -> Result<ContentId> {
        while !self.buckets.contains_key(&self.min_frequency) {
            if self.min_frequency >= self.max_frequency {
                return Err(OrbitalError::InvariantViolation(format!(
                    "LFU minimum frequency {} passed every bucket",
                    self.min_frequency
                )));
            }
            self.min_frequency += 1;
        }

        let frequency = self.min_frequency;
        let bucket = self.buckets.get_mut(&frequency).ok_or_else(|| {
            OrbitalError::InvariantViolation(format!("LFU bucket {} vanished", frequency))
        })?;
        let (victim, _) = bucket.pop_lru().ok_or_else(|| {
            OrbitalError::InvariantViolation(format!("LFU bucket {} is empty", frequency))
        })?;
        if bucket.is_empty() {
            self.buckets.remove(&frequency);
        }

        let entry = self.entries.remove(&victim).ok_or_else(|| {
            OrbitalError::InvariantViolation(format!("LFU bucket referenced missing entry {}", victim))
        })?;
        entry.trace_eviction(CacheStrategy::Lfu, &victim, self.tick);
        self.counters.evictions += 1;
        Ok(victim)
    }
}

impl CachePolicy for LfuPolicy {
    fn get(&mut self, content_id: &str) -> Option<Arc<ContentItem>> {
        self.tick += 1;
        let (item, old_frequency) = match self.entries.get_mut(content_id) {
            Some(entry) => {
                let old = entry.access_count;
                entry.touch(self.tick);
                (Arc::clone(&entry.item), old)
            }
            None => {
                self.counters.misses += 1;
                return None;
            }
        };

        self.promote(content_id, old_frequency);
        self.counters.hits += 1;
        Some(item)
    }

    fn put(&mut self, content_id: &str, item: Arc<ContentItem>) -> Result<Option<ContentId>> {
        self.tick += 1;
        if let Some(entry) = self.entries.get_mut(content_id) {
            // An update counts as an access but not as a hit
            let old_frequency = entry.access_count;
            entry.item = item;
            entry.touch(self.tick);
            self.promote(content_id, old_frequency);
            return Ok(None);
        }

        let evicted = if self.entries.len() >= self.capacity {
            Some(self.evict()?)
        } else {
            None
        };

        self.entries.insert(content_id.to_string(), CacheEntry::new(item, self.tick));
        self.bucket_mut(1).put(content_id.to_string(), ());
        self.min_frequency = 1;
        self.max_frequency = self.max_frequency.max(1);
        Ok(evicted)
    }

    fn contains(&self, content_id: &str) -> bool {
        self.entries.contains_key(content_id)
    }

    fn stats(&self) -> CacheStats {
        self.counters
            .snapshot(CacheStrategy::Lfu, self.entries.len(), self.capacity)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn keys(&self) -> Vec<ContentId> {
        let mut frequencies: Vec<_> = self.buckets.keys().copied().collect();
        frequencies.sort_unstable();
        frequencies
            .into_iter()
            .filter_map(|f| self.buckets.get(&f))
            .flat_map(|bucket| bucket.iter().rev().map(|(k, _)| k.clone()))
            .collect()
    }

    fn strategy(&self) -> CacheStrategy {
        CacheStrategy::Lfu
    }
}
