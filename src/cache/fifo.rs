//! First In First Out eviction.

use super::{validate_capacity, CacheEntry, CachePolicy, CacheStats, CacheStrategy, Counters};
use crate::error::{OrbitalError, Result};
use crate::types::{ContentId, ContentItem};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// FIFO cache: the oldest insertion is evicted first. Accesses and updates
/// never reorder entries.
pub struct FifoPolicy {
    entries: HashMap<ContentId, CacheEntry>,
    /// Insertion order, oldest at the front.
    order: VecDeque<ContentId>,
    capacity: usize,
    counters: Counters,
    /// Logical clock, advanced by every `get` and `put`.
    tick: u64,
}

impl FifoPolicy {
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = validate_capacity(capacity)?.get();
        Ok(Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
            counters: Counters::default(),
            tick: 0,
        })
    }

    fn evict_oldest(&mut self) -> Result<ContentId> {
        let victim = self.order.pop_front().ok_or_else(|| {
            OrbitalError::InvariantViolation("FIFO cache full but insertion queue is empty".to_string())
        })?;
        let entry = self.entries.remove(&victim).ok_or_else(|| {
            OrbitalError::InvariantViolation(format!("FIFO queue referenced missing entry {}", victim))
        })?;
        entry.trace_eviction(CacheStrategy::Fifo, &victim, self.tick);
        self.counters.evictions += 1;
        Ok(victim)
    }
}

impl CachePolicy for FifoPolicy {
    fn get(&mut self, content_id: &str) -> Option<Arc<ContentItem>> {
        self.tick += 1;
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
            // Insertion order is kept on update
            entry.item = item;
            entry.last_access = self.tick;
            return Ok(None);
        }

        let evicted = if self.entries.len() >= self.capacity {
            Some(self.evict_oldest()?)
        } else {
            None
        };

        self.entries.insert(content_id.to_string(), CacheEntry::new(item, self.tick));
        self.order.push_back(content_id.to_string());
        Ok(evicted)
    }

    fn contains(&self, content_id: &str) -> bool {
        self.entries.contains_key(content_id)
    }

    fn stats(&self) -> CacheStats {
        self.counters
            .snapshot(CacheStrategy::Fifo, self.entries.len(), self.capacity)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn keys(&self) -> Vec<ContentId> {
        self.order.iter().cloned().collect()
    }

    fn strategy(&self) -> CacheStrategy {
        CacheStrategy::Fifo
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::item;
    use super::*;

    #[test]
    fn test_fifo_ignores_access_pattern() {
        let mut cache = FifoPolicy::new(2).unwrap();
        cache.put("A", item("A")).unwrap();
        cache.put("B", item("B")).unwrap();

        for _ in 0..10 {
            assert!(cache.get("B").is_some());
        }

        assert_eq!(cache.put("C", item("C")).unwrap(), Some("A".to_string()));
        assert_eq!(cache.keys(), vec!["B".to_string(), "C".to_string()]);
    }

    #[test]
    fn test_fifo_evicts_oldest_even_if_hot() {
        let mut cache = FifoPolicy::new(2).unwrap();
        cache.put("A", item("A")).unwrap();
        cache.put("B", item("B")).unwrap();
        for _ in 0..5 {
            cache.get("A");
        }

        assert_eq!(cache.put("C", item("C")).unwrap(), Some("A".to_string()));
        assert!(!cache.contains("A"));
    }

    #[test]
    fn test_fifo_update_keeps_insertion_order() {
        let mut cache = FifoPolicy::new(2).unwrap();
        cache.put("A", item("A")).unwrap();
        cache.put("B", item("B")).unwrap();

        // Re-putting A must not make it younger than B
        assert_eq!(cache.put("A", item("A")).unwrap(), None);
        assert_eq!(cache.put("C", item("C")).unwrap(), Some("A".to_string()));

        let stats = cache.stats();
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.size, 2);
    }
}
