//! Content caching for satellite nodes.
//!
//! Every node stores content behind a [`CachePolicy`], a capacity-bounded
//! associative store counted in items (not bytes). Four strategies are
//! available:
//!
//! - [`LruPolicy`]: evicts the least recently touched entry
//! - [`LfuPolicy`]: evicts the least frequently used entry, least recently
//!   touched among equals
//! - [`FifoPolicy`]: evicts the oldest insertion regardless of accesses
//! - [`AdaptivePolicy`]: routes traffic to one of the three above and
//!   periodically re-selects it from windowed hit rates
//!
//! Content is shared with the catalog through `Arc<ContentItem>`; evicting an
//! entry only drops the cache's reference.
//!
//! # Example
//!
//! ```rust
//! use orbital_cdn::cache::{build_policy, CacheStrategy};
//! use orbital_cdn::types::{ContentItem, ContentType};
//! use std::sync::Arc;
//!
//! let mut cache = build_policy(CacheStrategy::Lru, 2, 100).unwrap();
//! let item = Arc::new(ContentItem::new("a", ContentType::Image, 4.0));
//!
//! cache.put("a", item).unwrap();
//! assert!(cache.get("a").is_some());
//! assert!(cache.get("b").is_none());
//!
//! let stats = cache.stats();
//! assert_eq!(stats.hits, 1);
//! assert_eq!(stats.misses, 1);
//! assert_eq!(stats.hit_rate, 50.0);
//! ```

pub mod adaptive;
pub mod fifo;
pub mod lfu;
pub mod lru;

pub use self::adaptive::{AdaptivePolicy, StrategySwitch, WindowPerformance};
pub use self::fifo::FifoPolicy;
pub use self::lfu::LfuPolicy;
pub use self::lru::LruPolicy;

use crate::error::{OrbitalError, Result};
use crate::types::{ContentId, ContentItem};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;

/// Default number of routed requests between adaptive evaluations.
pub const DEFAULT_EVALUATION_WINDOW: u64 = 100;

/// Cache eviction strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", from = "String")]
pub enum CacheStrategy {
    /// Least Recently Used
    #[default]
    Lru,
    /// Least Frequently Used
    Lfu,
    /// First In First Out
    Fifo,
    /// Switches between the other three based on windowed hit rate
    Adaptive,
}

impl CacheStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStrategy::Lru => "LRU",
            CacheStrategy::Lfu => "LFU",
            CacheStrategy::Fifo => "FIFO",
            CacheStrategy::Adaptive => "ADAPTIVE",
        }
    }

    /// Parses a strategy name case-insensitively, falling back to LRU for
    /// anything unrecognized.
    pub fn from_name_or_default(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            tracing::warn!(strategy = %name, "Unrecognized caching strategy, falling back to LRU");
            CacheStrategy::Lru
        })
    }
}

impl FromStr for CacheStrategy {
    type Err = OrbitalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LRU" => Ok(CacheStrategy::Lru),
            "LFU" => Ok(CacheStrategy::Lfu),
            "FIFO" => Ok(CacheStrategy::Fifo),
            "ADAPTIVE" => Ok(CacheStrategy::Adaptive),
            other => Err(OrbitalError::Config(format!("unknown caching strategy: {}", other))),
        }
    }
}

impl From<String> for CacheStrategy {
    fn from(name: String) -> Self {
        CacheStrategy::from_name_or_default(&name)
    }
}

impl fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Capability shared by every eviction strategy.
///
/// `get` and `put` keep the strategy's bookkeeping current; `contains` is a
/// pure membership test and never counts as a hit or miss.
pub trait CachePolicy: Send {
    /// Looks up an item, counting a hit or a miss.
    fn get(&mut self, content_id: &str) -> Option<Arc<ContentItem>>;

    /// Inserts or updates an item. Returns the id evicted to make room, if any.
    fn put(&mut self, content_id: &str, item: Arc<ContentItem>) -> Result<Option<ContentId>>;

    /// Membership test without side effects.
    fn contains(&self, content_id: &str) -> bool;

    /// Statistics snapshot.
    fn stats(&self) -> CacheStats;

    /// Number of cached items.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of cached items.
    fn capacity(&self) -> usize;

    /// Cached ids in eviction order, next victim first.
    fn keys(&self) -> Vec<ContentId>;

    /// Strategy implemented by this policy.
    fn strategy(&self) -> CacheStrategy;
}

/// Builds a boxed policy for the given strategy.
pub fn build_policy(
    strategy: CacheStrategy,
    capacity: usize,
    evaluation_window: u64,
) -> Result<Box<dyn CachePolicy>> {
    let policy: Box<dyn CachePolicy> = match strategy {
        CacheStrategy::Lru => Box::new(LruPolicy::new(capacity)?),
        CacheStrategy::Lfu => Box::new(LfuPolicy::new(capacity)?),
        CacheStrategy::Fifo => Box::new(FifoPolicy::new(capacity)?),
        CacheStrategy::Adaptive => Box::new(AdaptivePolicy::new(capacity, evaluation_window)?),
    };
    Ok(policy)
}

/// Cache statistics snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Strategy answering traffic (the active constituent for adaptive caches).
    pub strategy: CacheStrategy,
    /// Total number of cache hits.
    pub hits: u64,
    /// Total number of cache misses.
    pub misses: u64,
    /// Hit rate in percent.
    pub hit_rate: f64,
    /// Total number of evictions.
    pub evictions: u64,
    /// Current number of cached entries.
    pub size: usize,
    /// Maximum number of cached entries.
    pub capacity: usize,
    /// Fill level in percent.
    pub utilization: f64,
    /// Present only for adaptive caches.
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub adaptive: Option<AdaptiveStats>,
}

/// Extra statistics reported by [`AdaptivePolicy`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdaptiveStats {
    pub adaptive: bool,
    pub current_strategy: CacheStrategy,
    /// Most recent strategy switches, oldest first.
    pub strategy_history: Vec<StrategySwitch>,
    /// Windowed counters per constituent strategy.
    pub strategy_performance: BTreeMap<CacheStrategy, WindowPerformance>,
}

/// Hit rate in percent, 0 when nothing was requested yet.
pub fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        return 0.0;
    }
    hits as f64 / total as f64 * 100.0
}

/// Fill level in percent, 0 for a zero capacity.
pub fn utilization(size: usize, capacity: usize) -> f64 {
    if capacity == 0 {
        return 0.0;
    }
    size as f64 / capacity as f64 * 100.0
}

/// Rejects zero capacities at construction time.
pub(crate) fn validate_capacity(capacity: usize) -> Result<NonZeroUsize> {
    NonZeroUsize::new(capacity)
        .ok_or_else(|| OrbitalError::invalid_config("cache.capacity", "capacity must be positive"))
}

/// Cumulative counters shared by the concrete policies.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Counters {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl Counters {
    pub fn snapshot(&self, strategy: CacheStrategy, size: usize, capacity: usize) -> CacheStats {
        CacheStats {
            strategy,
            hits: self.hits,
            misses: self.misses,
            hit_rate: hit_rate(self.hits, self.misses),
            evictions: self.evictions,
            size,
            capacity,
            utilization: utilization(size, capacity),
            adaptive: None,
        }
    }
}

/// Cache entry with policy bookkeeping.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    /// The cached item.
    pub item: Arc<ContentItem>,
    /// Number of accesses, starting at 1 on insertion.
    pub access_count: u64,
    /// Policy tick of the last `get` hit or update.
    pub last_access: u64,
}

impl CacheEntry {
    pub fn new(item: Arc<ContentItem>, tick: u64) -> Self {
        Self {
            item,
            access_count: 1,
            last_access: tick,
        }
    }

    pub fn touch(&mut self, tick: u64) {
        self.access_count += 1;
        self.last_access = tick;
    }

    /// Emits the eviction event for this entry.
    pub fn trace_eviction(&self, strategy: CacheStrategy, content_id: &str, tick: u64) {
        tracing::trace!(
            strategy = %strategy,
            content_id = %content_id,
            accesses = self.access_count,
            idle_ticks = tick.saturating_sub(self.last_access),
            "Cache entry evicted"
        );
    }
}
