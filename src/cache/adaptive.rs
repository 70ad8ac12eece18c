//! Adaptive strategy selection.
//!
//! [`AdaptivePolicy`] holds one LRU, one LFU and one FIFO cache of equal
//! capacity. Only the current one serves traffic. Every `evaluation_window`
//! routed lookups the windowed hit rates are compared and the strategy with
//! the strictly highest rate becomes current; ties keep the current strategy.
//!
//! The constituents that are not current never receive `put`, so their
//! contents are stale and their windowed counters only move while they are
//! current. Evaluation is therefore speculative.

use super::{
    hit_rate, AdaptiveStats, CachePolicy, CacheStats, CacheStrategy, FifoPolicy, LfuPolicy,
    LruPolicy,
};
use crate::error::{OrbitalError, Result};
use crate::types::{ContentId, ContentItem};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::info;

/// Number of strategy switches kept in the history.
pub const SWITCH_HISTORY_LEN: usize = 5;

const CONSTITUENTS: [CacheStrategy; 3] = [CacheStrategy::Lru, CacheStrategy::Lfu, CacheStrategy::Fifo];

/// A recorded change of the active strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySwitch {
    pub from: CacheStrategy,
    pub to: CacheStrategy,
    /// Windowed hit rate of the new strategy, in percent.
    pub hit_rate: f64,
    /// Routed request count at the time of the switch.
    pub request_count: u64,
}

/// Windowed counters for one constituent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowPerformance {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Window {
    hits: u64,
    misses: u64,
}

impl Window {
    fn record(&mut self, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    /// None when the window saw no requests.
    fn rate(&self) -> Option<f64> {
        if self.hits + self.misses == 0 {
            None
        } else {
            Some(hit_rate(self.hits, self.misses))
        }
    }
}

/// Cache that switches between LRU, LFU and FIFO.
pub struct AdaptivePolicy {
    lru: LruPolicy,
    lfu: LfuPolicy,
    fifo: FifoPolicy,
    current: CacheStrategy,
    evaluation_window: u64,
    request_count: u64,
    windows: [Window; 3],
    history: VecDeque<StrategySwitch>,
}

fn slot(strategy: CacheStrategy) -> usize {
    match strategy {
        CacheStrategy::Lru => 0,
        CacheStrategy::Lfu => 1,
        CacheStrategy::Fifo => 2,
        // never current; constructor and evaluate only pick constituents
        CacheStrategy::Adaptive => 0,
    }
}

impl AdaptivePolicy {
    /// Create an adaptive cache. LRU is current initially.
    pub fn new(capacity: usize, evaluation_window: u64) -> Result<Self> {
        if evaluation_window == 0 {
            return Err(OrbitalError::invalid_config(
                "cache.evaluation_window",
                "evaluation window must be positive",
            ));
        }

        Ok(Self {
            lru: LruPolicy::new(capacity)?,
            lfu: LfuPolicy::new(capacity)?,
            fifo: FifoPolicy::new(capacity)?,
            current: CacheStrategy::Lru,
            evaluation_window,
            request_count: 0,
            windows: [Window::default(); 3],
            history: VecDeque::with_capacity(SWITCH_HISTORY_LEN),
        })
    }

    /// Strategy currently serving traffic.
    pub fn current_strategy(&self) -> CacheStrategy {
        self.current
    }

    /// Number of lookups routed so far.
    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    /// Recent switches, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &StrategySwitch> {
        self.history.iter()
    }

    fn active(&self) -> &dyn CachePolicy {
        match self.current {
            CacheStrategy::Lfu => &self.lfu,
            CacheStrategy::Fifo => &self.fifo,
            _ => &self.lru,
        }
    }

    fn active_mut(&mut self) -> &mut dyn CachePolicy {
        match self.current {
            CacheStrategy::Lfu => &mut self.lfu,
            CacheStrategy::Fifo => &mut self.fifo,
            _ => &mut self.lru,
        }
    }

    /// Compares windowed hit rates and switches if another constituent is
    /// strictly better than the current one.
    fn evaluate(&mut self) {
        let mut best = self.current;
        let mut best_rate = self.windows[slot(self.current)].rate().unwrap_or(0.0);

        for strategy in CONSTITUENTS {
            if strategy == self.current {
                continue;
            }
            if let Some(rate) = self.windows[slot(strategy)].rate() {
                if rate > best_rate {
                    best = strategy;
                    best_rate = rate;
                }
            }
        }

        if best == self.current {
            return;
        }

        info!(
            from = %self.current,
            to = %best,
            hit_rate = best_rate,
            request_count = self.request_count,
            "Adaptive cache switching strategy"
        );

        self.history.push_back(StrategySwitch {
            from: self.current,
            to: best,
            hit_rate: best_rate,
            request_count: self.request_count,
        });
        while self.history.len() > SWITCH_HISTORY_LEN {
            self.history.pop_front();
        }

        self.current = best;
        self.windows = [Window::default(); 3];
    }

    fn performance(&self) -> BTreeMap<CacheStrategy, WindowPerformance> {
        CONSTITUENTS
            .iter()
            .map(|&strategy| {
                let window = self.windows[slot(strategy)];
                (
                    strategy,
                    WindowPerformance {
                        hits: window.hits,
                        misses: window.misses,
                        hit_rate: window.rate().unwrap_or(0.0),
                    },
                )
            })
            .collect()
    }
}

impl CachePolicy for AdaptivePolicy {
    fn get(&mut self, content_id: &str) -> Option<Arc<ContentItem>> {
        self.request_count += 1;

        let result = self.active_mut().get(content_id);
        self.windows[slot(self.current)].record(result.is_some());

        if self.request_count % self.evaluation_window == 0 {
            self.evaluate();
        }

        result
    }

    fn put(&mut self, content_id: &str, item: Arc<ContentItem>) -> Result<Option<ContentId>> {
        self.active_mut().put(content_id, item)
    }

    fn contains(&self, content_id: &str) -> bool {
        self.active().contains(content_id)
    }

    fn stats(&self) -> CacheStats {
        let mut stats = self.active().stats();
        stats.adaptive = Some(AdaptiveStats {
            adaptive: true,
            current_strategy: self.current,
            strategy_history: self.history.iter().cloned().collect(),
            strategy_performance: self.performance(),
        });
        stats
    }

    fn len(&self) -> usize {
        self.active().len()
    }

    fn capacity(&self) -> usize {
        self.active().capacity()
    }

    fn keys(&self) -> Vec<ContentId> {
        self.active().keys()
    }

    fn strategy(&self) -> CacheStrategy {
        CacheStrategy::Adaptive
    }
}
