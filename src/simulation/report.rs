//! Final report of a run.

use crate::cache::CacheStrategy;
use crate::config::SimulationConfig;
use crate::constellation::ConstellationStats;
use crate::node::{NodeStatistics, RequestStatus};
use crate::types::SimTime;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Number of requests per terminal status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub hit: u64,
    pub neighbor_hit: u64,
    pub miss: u64,
    pub error: u64,
}

impl StatusCounts {
    pub fn record(&mut self, status: RequestStatus) {
        match status {
            RequestStatus::Hit => self.hit += 1,
            RequestStatus::NeighborHit => self.neighbor_hit += 1,
            RequestStatus::Miss => self.miss += 1,
            RequestStatus::Error => self.error += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.hit + self.neighbor_hit + self.miss + self.error
    }
}

/// Everything worth keeping from a run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub run_id: Uuid,
    /// Wall-clock time the report was produced.
    pub generated_at: DateTime<Utc>,
    pub strategy: CacheStrategy,
    pub capacity: usize,
    pub node_count: usize,
    /// Virtual time at which the report was taken.
    pub simulated_seconds: SimTime,
    pub status_counts: StatusCounts,
    pub nodes: Vec<NodeStatistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constellation: Option<ConstellationStats>,
}

impl SimulationReport {
    pub fn new(
        config: &SimulationConfig,
        simulated_seconds: SimTime,
        status_counts: StatusCounts,
        nodes: Vec<NodeStatistics>,
        constellation: Option<ConstellationStats>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            strategy: config.cache.strategy,
            capacity: config.cache.capacity,
            node_count: config.node_count(),
            simulated_seconds,
            status_counts,
            nodes,
            constellation,
        }
    }

    /// Share of requests served without the ground station, in percent.
    pub fn hit_rate(&self) -> f64 {
        let total = self.status_counts.total();
        if total == 0 {
            return 0.0;
        }
        (self.status_counts.hit + self.status_counts.neighbor_hit) as f64 / total as f64 * 100.0
    }

    pub fn megabytes_delivered(&self) -> f64 {
        self.nodes.iter().map(|n| n.megabytes_delivered).sum()
    }

    pub fn to_json_pretty(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
