//! Delivery latency model.
//!
//! Transfers are never performed; their cost is computed from fixed link
//! characteristics:
//!
//! ```text
//! seconds = size_mb * 8 / bandwidth_mbps + latency_ms / 1000
//! ```
//!
//! The local leg (satellite to user, or satellite to satellite) is the short
//! hop; the origin leg goes through the ground station.

use crate::error::{OrbitalError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a transfer originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliverySource {
    /// A satellite cache: the serving node or a neighbour.
    Local,
    /// The ground station.
    Origin,
}

impl fmt::Display for DeliverySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliverySource::Local => f.write_str("local"),
            DeliverySource::Origin => f.write_str("origin"),
        }
    }
}

/// Link characteristics shared by every node of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkMetrics {
    /// One-way latency of a satellite hop in milliseconds.
    pub local_latency_ms: f64,
    /// Satellite link bandwidth in Mbps.
    pub local_bandwidth_mbps: f64,
    /// One-way latency of the ground station leg in milliseconds.
    pub origin_latency_ms: f64,
    /// Ground station bandwidth in Mbps.
    pub origin_bandwidth_mbps: f64,
}

impl Default for NetworkMetrics {
    fn default() -> Self {
        Self {
            local_latency_ms: 15.0,
            local_bandwidth_mbps: 100.0,
            origin_latency_ms: 150.0,
            origin_bandwidth_mbps: 1000.0,
        }
    }
}

impl NetworkMetrics {
    /// Rejects bandwidths that are not strictly positive and latencies that
    /// are negative. Non-finite values are rejected for both.
    pub fn validate(&self) -> Result<()> {
        let bandwidths = [
            ("network.local_bandwidth_mbps", self.local_bandwidth_mbps),
            ("network.origin_bandwidth_mbps", self.origin_bandwidth_mbps),
        ];
        for (field, value) in bandwidths {
            if !value.is_finite() || value <= 0.0 {
                return Err(OrbitalError::invalid_config(
                    field,
                    format!("bandwidth must be positive, got {}", value),
                ));
            }
        }

        let latencies = [
            ("network.local_latency_ms", self.local_latency_ms),
            ("network.origin_latency_ms", self.origin_latency_ms),
        ];
        for (field, value) in latencies {
            if !value.is_finite() || value < 0.0 {
                return Err(OrbitalError::invalid_config(
                    field,
                    format!("latency must be non-negative, got {}", value),
                ));
            }
        }

        Ok(())
    }

    pub fn latency_ms(&self, source: DeliverySource) -> f64 {
        match source {
            DeliverySource::Local => self.local_latency_ms,
            DeliverySource::Origin => self.origin_latency_ms,
        }
    }

    pub fn bandwidth_mbps(&self, source: DeliverySource) -> f64 {
        match source {
            DeliverySource::Local => self.local_bandwidth_mbps,
            DeliverySource::Origin => self.origin_bandwidth_mbps,
        }
    }

    /// Seconds needed to move `size_mb` megabytes from `source`.
    pub fn delivery_time(&self, size_mb: f64, source: DeliverySource) -> f64 {
        let transfer = size_mb * 8.0 / self.bandwidth_mbps(source);
        transfer + self.latency_ms(source) / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_delivery_times() {
        let metrics = NetworkMetrics::default();

        // 10 MB over 100 Mbps plus 15 ms
        let local = metrics.delivery_time(10.0, DeliverySource::Local);
        assert!((local - 0.815).abs() < 1e-9);

        // 10 MB over 1000 Mbps plus 150 ms
        let origin = metrics.delivery_time(10.0, DeliverySource::Origin);
        assert!((origin - 0.23).abs() < 1e-9);
    }

    #[test]
    fn test_delivery_time_monotonic_in_size() {
        let metrics = NetworkMetrics::default();
        for source in [DeliverySource::Local, DeliverySource::Origin] {
            let mut previous = metrics.delivery_time(0.0, source);
            for size in [0.5, 1.0, 2.0, 45.0, 450.0] {
                let current = metrics.delivery_time(size, source);
                assert!(current > previous, "{} not monotonic at {}", source, size);
                previous = current;
            }
        }
    }

    #[test]
    fn test_local_faster_than_origin_below_crossover() {
        let metrics = NetworkMetrics::default();
        let faster_locally =
            |size: f64| metrics.delivery_time(size, DeliverySource::Local)
                < metrics.delivery_time(size, DeliverySource::Origin);

        // Equal at 1.875 MB: 0.08 s/MB + 15 ms against 0.008 s/MB + 150 ms
        for size in [0.001, 0.5, 1.0, 1.5, 1.87] {
            assert!(faster_locally(size), "local slower at {} MB", size);
        }
        for size in [1.9, 2.0, 10.0, 450.0] {
            assert!(!faster_locally(size), "local faster at {} MB", size);
        }

        let local = metrics.delivery_time(1.875, DeliverySource::Local);
        let origin = metrics.delivery_time(1.875, DeliverySource::Origin);
        assert!((local - origin).abs() < 1e-9);
    }

    #[test]
    fn test_validate_rejects_bad_metrics() {
        assert!(NetworkMetrics::default().validate().is_ok());

        let metrics = NetworkMetrics {
            local_bandwidth_mbps: 0.0,
            ..Default::default()
        };
        assert!(metrics.validate().unwrap_err().is_config());

        let metrics = NetworkMetrics {
            origin_bandwidth_mbps: f64::NAN,
            ..Default::default()
        };
        assert!(metrics.validate().is_err());

        let metrics = NetworkMetrics {
            origin_latency_ms: -1.0,
            ..Default::default()
        };
        assert!(metrics.validate().is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let parsed: std::result::Result<NetworkMetrics, _> =
            serde_json::from_str(r#"{"local_latency_ms": 20.0, "packet_loss": 0.1}"#);
        assert!(parsed.is_err());

        let parsed: NetworkMetrics = serde_json::from_str(r#"{"local_latency_ms": 20.0}"#).unwrap();
        assert_eq!(parsed.local_latency_ms, 20.0);
        assert_eq!(parsed.origin_bandwidth_mbps, 1000.0);
    }
}
