//! Satellite node and its request pipeline.
//!
//! A [`Node`] owns one cache policy and serves requests through a fixed
//! pipeline:
//!
//! ```text
//! user_request -> node_receive -> (catalog) -> cache_check
//!     hit:  cache_hit -> local_delivery
//!     miss: cache_miss -> [inter_node_transfer -> cache_update]   neighbour hit
//!                      -> origin_fetch -> node_upload -> cache_update
//!                         -> local_delivery                       origin
//! -> delivery_complete
//! ```
//!
//! Unknown content ends in an `error` step right after `node_receive` and
//! never touches the cache. Time is virtual: the caller passes the arrival
//! time and every step advances a local cursor by its modelled cost.

mod trace;

pub use self::trace::{
    ContentSource, NodeStatistics, PerformanceSample, RequestStatus, RequestTrace, TraceAction,
    TraceStep,
};

use crate::cache::{CachePolicy, CacheStats, CacheStrategy};
use crate::catalog::ContentCatalog;
use crate::delivery::{DeliverySource, NetworkMetrics};
use crate::error::{OrbitalError, Result};
use crate::types::{ContentId, ContentItem, NodeId, SimTime};
use std::sync::Arc;
use tracing::{debug, error};

/// Fixed cost of bookkeeping steps, in seconds.
const STEP_COST: f64 = 0.001;

/// Content obtained from another node's cache.
#[derive(Debug, Clone)]
pub struct NeighborHit {
    pub node_id: NodeId,
    pub distance: f64,
    pub item: Arc<ContentItem>,
}

/// Access to other nodes' caches during a local miss.
pub trait NeighborLookup {
    /// Whether any neighbour can be asked at all.
    fn is_active(&self) -> bool {
        true
    }

    /// Pulls `content_id` from the first neighbour that holds it.
    fn fetch(&mut self, content_id: &str) -> Option<NeighborHit>;
}

/// Lookup for a node running alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNeighbors;

impl NeighborLookup for NoNeighbors {
    fn is_active(&self) -> bool {
        false
    }

    fn fetch(&mut self, _content_id: &str) -> Option<NeighborHit> {
        None
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct NodeCounters {
    total_requests: u64,
    hits: u64,
    neighbor_hits: u64,
    misses: u64,
    errors: u64,
    inter_node_requests: u64,
    inter_node_hits: u64,
}

/// A satellite with a private cache.
pub struct Node {
    id: NodeId,
    cache: Box<dyn CachePolicy>,
    metrics: Arc<NetworkMetrics>,
    counters: NodeCounters,
    megabytes_delivered: f64,
    request_log: Vec<RequestTrace>,
    performance_log: Vec<PerformanceSample>,
}

/// Accumulates trace steps while advancing virtual time.
struct StepRecorder {
    start: SimTime,
    cursor: SimTime,
    steps: Vec<TraceStep>,
}

impl StepRecorder {
    fn new(start: SimTime) -> Self {
        Self {
            start,
            cursor: start,
            steps: Vec::with_capacity(10),
        }
    }

    /// Records a step starting now and advances the cursor by `seconds`.
    fn record(
        &mut self,
        action: TraceAction,
        seconds: f64,
        message: impl Into<String>,
        location: impl Into<String>,
    ) {
        self.steps.push(TraceStep {
            time: self.cursor,
            action,
            message: message.into(),
            latency_ms: seconds * 1000.0,
            location: location.into(),
        });
        self.cursor += seconds;
    }

    fn elapsed(&self) -> f64 {
        self.cursor - self.start
    }
}

impl Node {
    pub fn new(
        id: impl Into<NodeId>,
        cache: Box<dyn CachePolicy>,
        metrics: Arc<NetworkMetrics>,
    ) -> Self {
        Self {
            id: id.into(),
            cache,
            metrics,
            counters: NodeCounters::default(),
            megabytes_delivered: 0.0,
            request_log: Vec::new(),
            performance_log: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Configured strategy of the cache.
    pub fn strategy(&self) -> CacheStrategy {
        self.cache.strategy()
    }

    pub fn total_requests(&self) -> u64 {
        self.counters.total_requests
    }

    pub fn megabytes_delivered(&self) -> f64 {
        self.megabytes_delivered
    }

    pub fn request_log(&self) -> &[RequestTrace] {
        &self.request_log
    }

    pub fn performance_log(&self) -> &[PerformanceSample] {
        &self.performance_log
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Membership test used by neighbours; no bookkeeping.
    pub fn cache_contains(&self, content_id: &str) -> bool {
        self.cache.contains(content_id)
    }

    /// Hands cached content to a neighbour. Counts as a regular `get` on
    /// this node's cache.
    pub fn serve_neighbor(&mut self, content_id: &str) -> Option<Arc<ContentItem>> {
        self.cache.get(content_id)
    }

    /// Runs one request through the pipeline.
    ///
    /// Unknown content is reported in-band with [`RequestStatus::Error`]. An
    /// `Err` is only returned when the cache reports a broken invariant.
    pub fn request_content(
        &mut self,
        content_id: &str,
        user_id: &str,
        now: SimTime,
        catalog: &dyn ContentCatalog,
        neighbors: &mut dyn NeighborLookup,
    ) -> Result<RequestTrace> {
        self.counters.total_requests += 1;

        let node_location = format!("Satellite {}", self.id);
        let mut steps = StepRecorder::new(now);
        steps.record(
            TraceAction::UserRequest,
            STEP_COST,
            format!("User {} requests {}", user_id, content_id),
            format!("User {}", user_id),
        );
        steps.record(
            TraceAction::NodeReceive,
            self.metrics.local_latency_ms / 1000.0,
            format!("Request received by {}", self.id),
            node_location.as_str(),
        );

        let item = match catalog.resolve(content_id) {
            Some(item) => item,
            None => {
                let err = OrbitalError::ContentNotFound(content_id.to_string());
                steps.record(TraceAction::Error, 0.0, err.to_string(), "Catalog");
                self.counters.errors += 1;
                debug!(node = %self.id, content_id = %content_id, "Unknown content requested");

                let trace = RequestTrace {
                    timestamp: now,
                    node_id: self.id.clone(),
                    user_id: user_id.to_string(),
                    content_id: content_id.to_string(),
                    size_mb: None,
                    status: RequestStatus::Error,
                    source: ContentSource::None,
                    delivery_time: 0.0,
                    total_time: steps.elapsed(),
                    evicted: None,
                    error: Some(err.to_string()),
                    steps: steps.steps,
                };
                self.request_log.push(trace.clone());
                return Ok(trace);
            }
        };

        steps.record(
            TraceAction::CacheCheck,
            STEP_COST,
            format!("Checking cache for {}", content_id),
            node_location.as_str(),
        );

        let size = item.size_mb;
        let local = self.metrics.delivery_time(size, DeliverySource::Local);
        let mut evicted = None;

        let (status, source, delivery_time) = if self.cache.get(content_id).is_some() {
            steps.record(
                TraceAction::CacheHit,
                STEP_COST,
                "Content found in local cache",
                node_location.as_str(),
            );
            steps.record(
                TraceAction::LocalDelivery,
                local,
                format!("Delivering {} MB from {}", size, self.id),
                format!("{} -> User {}", node_location, user_id),
            );
            self.counters.hits += 1;
            (RequestStatus::Hit, ContentSource::LocalCache, local)
        } else {
            steps.record(
                TraceAction::CacheMiss,
                STEP_COST,
                "Content not in local cache",
                node_location.as_str(),
            );

            let neighbor = if neighbors.is_active() {
                self.counters.inter_node_requests += 1;
                neighbors.fetch(content_id)
            } else {
                None
            };

            match neighbor {
                Some(hit) => {
                    self.counters.inter_node_hits += 1;
                    self.counters.neighbor_hits += 1;

                    steps.record(
                        TraceAction::InterNodeTransfer,
                        local,
                        format!("Pulling {} MB from {} ({:.2} away)", size, hit.node_id, hit.distance),
                        format!("Satellite {} -> {}", hit.node_id, node_location),
                    );
                    evicted = self.store(content_id, hit.item, &mut steps)?;
                    steps.record(
                        TraceAction::LocalDelivery,
                        local,
                        format!("Delivering {} MB from {}", size, self.id),
                        format!("{} -> User {}", node_location, user_id),
                    );

                    let source = ContentSource::Neighbor {
                        node_id: hit.node_id,
                        distance: hit.distance,
                    };
                    (RequestStatus::NeighborHit, source, local + local)
                }
                None => {
                    let origin = self.metrics.delivery_time(size, DeliverySource::Origin);
                    steps.record(
                        TraceAction::OriginFetch,
                        origin,
                        format!("Fetching {} MB from ground station", size),
                        "Ground Station",
                    );
                    steps.record(
                        TraceAction::NodeUpload,
                        origin,
                        format!("Uploading {} MB to {}", size, self.id),
                        format!("Ground Station -> {}", node_location),
                    );
                    evicted = self.store(content_id, Arc::clone(&item), &mut steps)?;
                    steps.record(
                        TraceAction::LocalDelivery,
                        local,
                        format!("Delivering {} MB from {}", size, self.id),
                        format!("{} -> User {}", node_location, user_id),
                    );
                    self.counters.misses += 1;
                    (RequestStatus::Miss, ContentSource::Origin, origin + origin + local)
                }
            }
        };

        steps.record(
            TraceAction::DeliveryComplete,
            0.0,
            "Content delivered to user",
            format!("User {}", user_id),
        );
        self.megabytes_delivered += size;

        debug!(
            node = %self.id,
            content_id = %content_id,
            status = %status,
            source = %source,
            delivery_time,
            "Request served"
        );

        let trace = RequestTrace {
            timestamp: now,
            node_id: self.id.clone(),
            user_id: user_id.to_string(),
            content_id: content_id.to_string(),
            size_mb: Some(size),
            status,
            source,
            delivery_time,
            total_time: steps.elapsed(),
            evicted,
            error: None,
            steps: steps.steps,
        };
        self.request_log.push(trace.clone());
        Ok(trace)
    }

    /// Inserts content into the local cache and records the update step.
    fn store(
        &mut self,
        content_id: &str,
        item: Arc<ContentItem>,
        steps: &mut StepRecorder,
    ) -> Result<Option<ContentId>> {
        let evicted = self.cache.put(content_id, item).map_err(|e| {
            error!(node = %self.id, content_id = %content_id, error = %e, "Cache update failed");
            e
        })?;

        let message = match &evicted {
            Some(victim) => {
                debug!(node = %self.id, evicted = %victim, "Evicted to make room");
                format!("Cached {} (evicted {})", content_id, victim)
            }
            None => format!("Cached {}", content_id),
        };
        steps.record(
            TraceAction::CacheUpdate,
            STEP_COST,
            message,
            format!("Satellite {}", self.id),
        );
        Ok(evicted)
    }

    /// Appends a performance sample taken at `now`.
    pub fn log_performance(&mut self, now: SimTime) -> &PerformanceSample {
        let stats = self.cache.stats();
        let index = self.performance_log.len();
        self.performance_log.push(PerformanceSample {
            timestamp: now,
            cache_utilization: stats.utilization,
            hit_rate: stats.hit_rate,
            total_requests: self.counters.total_requests,
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            megabytes_delivered: self.megabytes_delivered,
        });
        &self.performance_log[index]
    }

    pub fn statistics(&self) -> NodeStatistics {
        let cache = self.cache.stats();
        let c = self.counters;

        let average_utilization = if self.performance_log.is_empty() {
            cache.utilization
        } else {
            self.performance_log
                .iter()
                .map(|s| s.cache_utilization)
                .sum::<f64>()
                / self.performance_log.len() as f64
        };

        let served = c.hits + c.neighbor_hits;
        let hit_rate = if c.total_requests == 0 {
            0.0
        } else {
            served as f64 / c.total_requests as f64 * 100.0
        };

        NodeStatistics {
            node_id: self.id.clone(),
            total_requests: c.total_requests,
            hits: c.hits,
            neighbor_hits: c.neighbor_hits,
            misses: c.misses,
            errors: c.errors,
            hit_rate,
            inter_node_requests: c.inter_node_requests,
            inter_node_hits: c.inter_node_hits,
            megabytes_delivered: self.megabytes_delivered,
            average_utilization,
            cached_content: self.cache.keys(),
            cache,
        }
    }
}
