//! Configuration module for orbital-cdn.
//!
//! A run is described by a single JSON document. Every section is optional
//! and falls back to its defaults; the whole document is validated eagerly
//! when loaded so a bad value fails before any simulation state is built.
//!
//! ```json
//! {
//!   "cache": { "capacity": 12, "strategy": "ADAPTIVE", "evaluation_window": 50 },
//!   "network": { "local_latency_ms": 20.0 },
//!   "constellation": { "node_count": 5 },
//!   "workload": { "duration": 300.0, "seed": 7 }
//! }
//! ```

use crate::cache::{CacheStrategy, DEFAULT_EVALUATION_WINDOW};
use crate::delivery::NetworkMetrics;
use crate::error::{OrbitalError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for a simulation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Cache configuration shared by every node.
    pub cache: CacheConfig,
    /// Link characteristics.
    pub network: NetworkMetrics,
    /// Constellation layout. Absent means a single node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constellation: Option<ConstellationConfig>,
    /// Generated traffic.
    pub workload: WorkloadConfig,
    /// Logging configuration.
    pub observability: ObservabilityConfig,
}

impl SimulationConfig {
    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            OrbitalError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| OrbitalError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        self.network.validate()?;
        if let Some(constellation) = &self.constellation {
            constellation.validate()?;
        }
        self.workload.validate()?;
        Ok(())
    }

    /// A short, chatty configuration for local experiments: a three-node
    /// adaptive constellation over one simulated minute.
    pub fn development() -> Self {
        Self {
            cache: CacheConfig {
                capacity: 5,
                strategy: CacheStrategy::Adaptive,
                evaluation_window: 20,
            },
            network: NetworkMetrics::default(),
            constellation: Some(ConstellationConfig {
                node_count: 3,
                ..Default::default()
            }),
            workload: WorkloadConfig {
                duration: 60.0,
                request_interval: 1.0,
                ..Default::default()
            },
            observability: ObservabilityConfig {
                log_level: "debug".to_string(),
                json_logs: false,
            },
        }
    }

    /// Node count of the run: 1 without a constellation.
    pub fn node_count(&self) -> usize {
        self.constellation.as_ref().map_or(1, |c| c.node_count)
    }
}

/// Cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached items per node.
    pub capacity: usize,
    /// Eviction strategy. Unknown names fall back to LRU.
    pub strategy: CacheStrategy,
    /// Routed requests between adaptive evaluations.
    pub evaluation_window: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            strategy: CacheStrategy::Lru,
            evaluation_window: DEFAULT_EVALUATION_WINDOW,
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(OrbitalError::invalid_config(
                "cache.capacity",
                "capacity must be positive",
            ));
        }

        if self.evaluation_window == 0 {
            return Err(OrbitalError::invalid_config(
                "cache.evaluation_window",
                "evaluation window must be positive",
            ));
        }

        Ok(())
    }
}

/// Constellation layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstellationConfig {
    /// Number of LEO satellites.
    pub node_count: usize,
    /// Neighbours further away than this are never asked.
    pub max_neighbor_distance: f64,
    /// Maximum number of neighbours asked per miss.
    pub max_neighbors: usize,
    /// Seed for the altitude jitter.
    pub altitude_seed: u64,
}

impl Default for ConstellationConfig {
    fn default() -> Self {
        Self {
            node_count: 5,
            max_neighbor_distance: 1000.0,
            max_neighbors: 3,
            altitude_seed: 42,
        }
    }
}

impl ConstellationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.node_count == 0 {
            return Err(OrbitalError::invalid_config(
                "constellation.node_count",
                "a constellation needs at least one node",
            ));
        }

        if !self.max_neighbor_distance.is_finite() || self.max_neighbor_distance < 0.0 {
            return Err(OrbitalError::invalid_config(
                "constellation.max_neighbor_distance",
                "distance must be finite and non-negative",
            ));
        }

        Ok(())
    }
}

/// Generated traffic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Simulated seconds.
    pub duration: f64,
    /// Seconds between two requests of the same user.
    pub request_interval: f64,
    /// Number of concurrent users.
    pub user_count: usize,
    /// Seconds between two performance samples.
    pub log_interval: f64,
    /// Seed for content selection.
    pub seed: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            duration: 200.0,
            request_interval: 3.0,
            user_count: 3,
            log_interval: 10.0,
            seed: 42,
        }
    }
}

impl WorkloadConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(OrbitalError::invalid_config(
                "workload.duration",
                "duration must be finite and non-negative",
            ));
        }

        let intervals = [
            ("workload.request_interval", self.request_interval),
            ("workload.log_interval", self.log_interval),
        ];
        for (field, value) in intervals {
            if !value.is_finite() || value <= 0.0 {
                return Err(OrbitalError::invalid_config(field, "interval must be positive"));
            }
        }

        Ok(())
    }
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level.
    pub log_level: String,
    /// Enable JSON logging.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SimulationConfig::default();
        assert_eq!(config.cache.capacity, 10);
        assert_eq!(config.cache.strategy, CacheStrategy::Lru);
        assert_eq!(config.cache.evaluation_window, 100);
        assert!(config.constellation.is_none());
        assert_eq!(config.node_count(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_development_config() {
        let config = SimulationConfig::development();
        assert_eq!(config.node_count(), 3);
        assert_eq!(config.cache.strategy, CacheStrategy::Adaptive);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document() {
        let config: SimulationConfig = serde_json::from_str(
            r#"{"cache": {"strategy": "lfu"}, "constellation": {"node_count": 2}}"#,
        )
        .unwrap();
        assert_eq!(config.cache.strategy, CacheStrategy::Lfu);
        assert_eq!(config.cache.capacity, 10);
        assert_eq!(config.node_count(), 2);
        assert_eq!(config.constellation.unwrap().max_neighbors, 3);
    }

    #[test]
    fn test_unknown_strategy_falls_back() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{"cache": {"strategy": "random"}}"#).unwrap();
        assert_eq!(config.cache.strategy, CacheStrategy::Lru);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = SimulationConfig::default();
        config.cache.capacity = 0;
        assert!(config.validate().unwrap_err().is_config());

        let mut config = SimulationConfig::default();
        config.network.origin_bandwidth_mbps = 0.0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.workload.request_interval = 0.0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.constellation = Some(ConstellationConfig {
            node_count: 0,
            ..Default::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_network_field_rejected() {
        let parsed: std::result::Result<SimulationConfig, _> =
            serde_json::from_str(r#"{"network": {"jitter_ms": 3.0}}"#);
        assert!(parsed.is_err());
    }
}
