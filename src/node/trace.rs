//! Request traces and performance samples.

use crate::cache::CacheStats;
use crate::types::{ContentId, NodeId, SimTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal outcome of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    /// Served from the local cache.
    Hit,
    /// Pulled from a neighbouring node's cache.
    NeighborHit,
    /// Fetched from the ground station.
    Miss,
    /// Unknown content; nothing was delivered.
    Error,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Hit => "HIT",
            RequestStatus::NeighborHit => "NEIGHBOR_HIT",
            RequestStatus::Miss => "MISS",
            RequestStatus::Error => "ERROR",
        }
    }

    /// Whether content reached the user.
    pub fn is_delivered(&self) -> bool {
        !matches!(self, RequestStatus::Error)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Where the delivered bytes came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentSource {
    LocalCache,
    Neighbor { node_id: NodeId, distance: f64 },
    /// The ground station.
    Origin,
    None,
}

impl fmt::Display for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentSource::LocalCache => f.write_str("local-cache"),
            ContentSource::Neighbor { node_id, distance } => {
                write!(f, "neighbor({}, {:.2})", node_id, distance)
            }
            ContentSource::Origin => f.write_str("origin"),
            ContentSource::None => f.write_str("none"),
        }
    }
}

/// Pipeline stage recorded in a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceAction {
    UserRequest,
    NodeReceive,
    CacheCheck,
    CacheHit,
    CacheMiss,
    InterNodeTransfer,
    OriginFetch,
    NodeUpload,
    CacheUpdate,
    LocalDelivery,
    DeliveryComplete,
    Error,
}

/// One timed step of the request pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    /// Virtual time at which the step started.
    pub time: SimTime,
    pub action: TraceAction,
    pub message: String,
    /// Cost of the step in milliseconds.
    pub latency_ms: f64,
    pub location: String,
}

/// Complete record of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestTrace {
    /// Virtual time at which the request arrived.
    pub timestamp: SimTime,
    pub node_id: NodeId,
    pub user_id: String,
    pub content_id: ContentId,
    /// Size of the resolved content, absent for unknown ids.
    pub size_mb: Option<f64>,
    pub status: RequestStatus,
    pub source: ContentSource,
    /// Seconds spent moving the content (0 on error).
    pub delivery_time: f64,
    /// Seconds from arrival to completion, including fixed pipeline costs.
    pub total_time: f64,
    /// Entry evicted to make room for this content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evicted: Option<ContentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub steps: Vec<TraceStep>,
}

impl RequestTrace {
    /// Actions in pipeline order.
    pub fn actions(&self) -> Vec<TraceAction> {
        self.steps.iter().map(|s| s.action).collect()
    }
}

/// Periodic sample taken by the monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    pub timestamp: SimTime,
    /// Cache fill level in percent.
    pub cache_utilization: f64,
    /// Cache hit rate in percent.
    pub hit_rate: f64,
    pub total_requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub megabytes_delivered: f64,
}

/// Snapshot of a node's counters and cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeStatistics {
    pub node_id: NodeId,
    pub total_requests: u64,
    pub hits: u64,
    pub neighbor_hits: u64,
    pub misses: u64,
    pub errors: u64,
    /// Share of requests served without the ground station, in percent.
    pub hit_rate: f64,
    pub inter_node_requests: u64,
    pub inter_node_hits: u64,
    pub megabytes_delivered: f64,
    /// Mean cache utilization over the performance samples, in percent.
    pub average_utilization: f64,
    pub cache: CacheStats,
    /// Cached ids, next victim first.
    pub cached_content: Vec<ContentId>,
}
