//! Multi-satellite constellation.
//!
//! Nodes sit at fixed positions. When a node misses locally it asks its
//! nearest neighbours (within `max_neighbor_distance`, at most
//! `max_neighbors` of them, closest first) before going to the ground
//! station. The first neighbour holding the content serves it through its
//! own cache `get`, so the donor's statistics move as for any other hit.
//!
//! Each node lives behind its own `parking_lot::Mutex`. The requester is
//! locked for the whole pipeline while donors are only probed with
//! `try_lock`: a busy donor is skipped rather than waited for, so two nodes
//! requesting from each other at the same time cannot deadlock.

use crate::cache::{build_policy, hit_rate, CacheStrategy};
use crate::catalog::ContentCatalog;
use crate::config::{CacheConfig, ConstellationConfig};
use crate::delivery::NetworkMetrics;
use crate::error::{OrbitalError, Result};
use crate::node::{NeighborHit, NeighborLookup, Node, NodeStatistics, RequestTrace};
use crate::types::{NodeId, SimTime};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Mean altitude of generated LEO satellites, in km.
pub const LEO_ALTITUDE_KM: f64 = 550.0;

/// Maximum deviation from [`LEO_ALTITUDE_KM`], in km.
pub const LEO_ALTITUDE_SPREAD_KM: f64 = 50.0;

/// Position of a satellite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Degrees.
    pub latitude: f64,
    /// Degrees.
    pub longitude: f64,
    /// Kilometres.
    pub altitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }

    /// Euclidean distance treating the three coordinates as orthogonal
    /// axes. Degrees and kilometres are mixed; the value only ranks
    /// neighbours.
    pub fn distance_to(&self, other: &Position) -> f64 {
        let lat = self.latitude - other.latitude;
        let lon = self.longitude - other.longitude;
        let alt = self.altitude - other.altitude;
        (lat * lat + lon * lon + alt * alt).sqrt()
    }
}

struct Member {
    id: NodeId,
    position: Position,
    node: Arc<Mutex<Node>>,
}

/// Per-node line of [`ConstellationStats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSummary {
    pub id: NodeId,
    pub position: Position,
    /// Cache fill level in percent.
    pub cache_utilization: f64,
    /// Share of requests served without the ground station, in percent.
    pub hit_rate: f64,
    pub total_requests: u64,
    /// Strategy currently answering traffic.
    pub strategy: CacheStrategy,
}

/// Aggregate view over every node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstellationStats {
    pub total_nodes: usize,
    pub total_requests: u64,
    /// Local and neighbour hits.
    pub total_hits: u64,
    pub total_misses: u64,
    pub total_errors: u64,
    pub overall_hit_rate: f64,
    pub inter_node_hits: u64,
    pub inter_node_hit_rate: f64,
    /// Shared strategy, or `ADAPTIVE` when nodes currently differ.
    pub strategy: CacheStrategy,
    pub nodes: Vec<NodeSummary>,
}

/// A fixed set of positioned nodes.
pub struct Constellation {
    members: Vec<Member>,
    max_neighbor_distance: f64,
    max_neighbors: usize,
}

impl Constellation {
    pub fn new(max_neighbor_distance: f64, max_neighbors: usize) -> Result<Self> {
        if !max_neighbor_distance.is_finite() || max_neighbor_distance < 0.0 {
            return Err(OrbitalError::invalid_config(
                "constellation.max_neighbor_distance",
                format!("must be a non-negative distance, got {}", max_neighbor_distance),
            ));
        }

        Ok(Self {
            members: Vec::new(),
            max_neighbor_distance,
            max_neighbors,
        })
    }

    /// Builds an evenly spread LEO constellation named `LEO-1..LEO-n`.
    ///
    /// Latitude and longitude step by `360 / n` degrees (latitude folded into
    /// `[-90, 90)`); altitudes are drawn from the configured seed.
    pub fn leo(
        config: &ConstellationConfig,
        cache: &CacheConfig,
        metrics: Arc<NetworkMetrics>,
    ) -> Result<Self> {
        config.validate()?;

        let mut constellation = Self::new(config.max_neighbor_distance, config.max_neighbors)?;
        let mut rng = StdRng::seed_from_u64(config.altitude_seed);
        let n = config.node_count as f64;

        for i in 0..config.node_count {
            let angle = i as f64 * 360.0 / n;
            let position = Position::new(
                angle % 180.0 - 90.0,
                angle % 360.0,
                LEO_ALTITUDE_KM + rng.gen_range(-LEO_ALTITUDE_SPREAD_KM..=LEO_ALTITUDE_SPREAD_KM),
            );

            let policy = build_policy(cache.strategy, cache.capacity, cache.evaluation_window)?;
            let node = Node::new(format!("LEO-{}", i + 1), policy, Arc::clone(&metrics));
            constellation.add_node(node, position)?;
        }

        info!(
            nodes = config.node_count,
            strategy = %cache.strategy,
            capacity = cache.capacity,
            "LEO constellation created"
        );
        Ok(constellation)
    }

    /// Adds a node. Ids must be unique.
    pub fn add_node(&mut self, node: Node, position: Position) -> Result<()> {
        let id = node.id().to_string();
        if self.members.iter().any(|m| m.id == id) {
            return Err(OrbitalError::Config(format!("duplicate node id: {}", id)));
        }

        self.members.push(Member {
            id,
            position,
            node: Arc::new(Mutex::new(node)),
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.id.as_str())
    }

    fn member(&self, node_id: &str) -> Result<&Member> {
        self.members
            .iter()
            .find(|m| m.id == node_id)
            .ok_or_else(|| OrbitalError::NodeNotFound(node_id.to_string()))
    }

    /// Shared handle to a node.
    pub fn node(&self, node_id: &str) -> Result<Arc<Mutex<Node>>> {
        self.member(node_id).map(|m| Arc::clone(&m.node))
    }

    pub fn position(&self, node_id: &str) -> Result<Position> {
        self.member(node_id).map(|m| m.position)
    }

    /// Nearest other nodes within range, closest first.
    pub fn neighbors(&self, node_id: &str) -> Result<Vec<(NodeId, f64)>> {
        Ok(self
            .candidates(self.member(node_id)?)
            .into_iter()
            .map(|(member, distance)| (member.id.clone(), distance))
            .collect())
    }

    fn candidates(&self, requester: &Member) -> Vec<(&Member, f64)> {
        let mut candidates: Vec<_> = self
            .members
            .iter()
            .filter(|m| m.id != requester.id)
            .map(|m| (m, requester.position.distance_to(&m.position)))
            .filter(|(_, distance)| *distance <= self.max_neighbor_distance)
            .collect();
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
        candidates.truncate(self.max_neighbors);
        candidates
    }

    /// Serves a request on `node_id`, consulting neighbours on a local miss.
    pub fn request_content(
        &self,
        node_id: &str,
        content_id: &str,
        user_id: &str,
        now: SimTime,
        catalog: &dyn ContentCatalog,
    ) -> Result<RequestTrace> {
        let requester = self.member(node_id)?;
        let mut lookup = DonorProbe {
            requester: &requester.id,
            candidates: self.candidates(requester),
        };

        let mut node = requester.node.lock();
        node.request_content(content_id, user_id, now, catalog, &mut lookup)
    }

    /// Maps a user to a node, stable across runs.
    pub fn assign_user(&self, user_id: &str) -> Result<&str> {
        if self.members.is_empty() {
            return Err(OrbitalError::NodeNotFound(format!(
                "no node available for user {}",
                user_id
            )));
        }
        let index = (fnv1a(user_id.as_bytes()) % self.members.len() as u64) as usize;
        Ok(self.members[index].id.as_str())
    }

    /// Appends a performance sample on every node.
    pub fn log_performance(&self, now: SimTime) {
        for member in &self.members {
            member.node.lock().log_performance(now);
        }
    }

    pub fn node_statistics(&self) -> Vec<NodeStatistics> {
        self.members
            .iter()
            .map(|m| m.node.lock().statistics())
            .collect()
    }

    /// Request traces of every node, node by node.
    pub fn request_log(&self) -> Vec<RequestTrace> {
        self.members
            .iter()
            .flat_map(|m| m.node.lock().request_log().to_vec())
            .collect()
    }

    pub fn stats(&self) -> ConstellationStats {
        let mut nodes = Vec::with_capacity(self.members.len());
        let mut total_requests = 0;
        let mut total_hits = 0;
        let mut total_misses = 0;
        let mut total_errors = 0;
        let mut inter_node_hits = 0;

        for member in &self.members {
            let stats = member.node.lock().statistics();
            total_requests += stats.total_requests;
            total_hits += stats.hits + stats.neighbor_hits;
            total_misses += stats.misses;
            total_errors += stats.errors;
            inter_node_hits += stats.inter_node_hits;

            nodes.push(NodeSummary {
                id: member.id.clone(),
                position: member.position,
                cache_utilization: stats.cache.utilization,
                hit_rate: stats.hit_rate,
                total_requests: stats.total_requests,
                strategy: stats.cache.strategy,
            });
        }

        let strategy = match nodes.first() {
            Some(first) if nodes.iter().all(|n| n.strategy == first.strategy) => first.strategy,
            Some(_) => CacheStrategy::Adaptive,
            None => CacheStrategy::default(),
        };

        ConstellationStats {
            total_nodes: self.members.len(),
            total_requests,
            total_hits,
            total_misses,
            total_errors,
            overall_hit_rate: share(total_hits, total_requests),
            inter_node_hits,
            inter_node_hit_rate: share(inter_node_hits, total_requests),
            strategy,
            nodes,
        }
    }
}

fn share(part: u64, total: u64) -> f64 {
    hit_rate(part, total.saturating_sub(part))
}

/// 64-bit FNV-1a.
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, &b| {
        (hash ^ b as u64).wrapping_mul(0x0100_0000_01b3)
    })
}

/// Probes candidate donors in order without blocking on any of them.
struct DonorProbe<'a> {
    requester: &'a str,
    candidates: Vec<(&'a Member, f64)>,
}

impl NeighborLookup for DonorProbe<'_> {
    fn is_active(&self) -> bool {
        true
    }

    fn fetch(&mut self, content_id: &str) -> Option<NeighborHit> {
        for (member, distance) in &self.candidates {
            let Some(mut donor) = member.node.try_lock() else {
                warn!(
                    node = %self.requester,
                    donor = %member.id,
                    content_id = %content_id,
                    "Neighbour busy, skipping"
                );
                continue;
            };

            if !donor.cache_contains(content_id) {
                continue;
            }
            if let Some(item) = donor.serve_neighbor(content_id) {
                debug!(
                    node = %self.requester,
                    donor = %member.id,
                    content_id = %content_id,
                    distance = *distance,
                    "Neighbour hit"
                );
                return Some(NeighborHit {
                    node_id: member.id.clone(),
                    distance: *distance,
                    item,
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::node::RequestStatus;
    use crate::types::{ContentItem, ContentType};

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::from_items([
            ContentItem::new("a", ContentType::Video, 10.0),
            ContentItem::new("b", ContentType::Image, 5.0),
        ])
    }

    fn lru_node(id: &str) -> Node {
        let cache = build_policy(CacheStrategy::Lru, 2, 100).unwrap();
        Node::new(id, cache, Arc::new(NetworkMetrics::default()))
    }

    fn pair() -> Constellation {
        let mut constellation = Constellation::new(1000.0, 3).unwrap();
        constellation
            .add_node(lru_node("S1"), Position::new(0.0, 0.0, 550.0))
            .unwrap();
        constellation
            .add_node(lru_node("S2"), Position::new(3.0, 4.0, 550.0))
            .unwrap();
        constellation
    }

    #[test]
    fn test_distance() {
        let a = Position::new(0.0, 0.0, 550.0);
        let b = Position::new(3.0, 4.0, 562.0);
        assert_eq!(a.distance_to(&b), 13.0);
        assert_eq!(b.distance_to(&a), 13.0);
        assert_eq!(a.distance_to(&a), 0.0);
    }

    #[test]
    fn test_neighbor_hit() {
        let catalog = catalog();
        let constellation = pair();

        let first = constellation
            .request_content("S1", "a", "u1", 0.0, &catalog)
            .unwrap();
        assert_eq!(first.status, RequestStatus::Miss);

        let second = constellation
            .request_content("S2", "a", "u2", 1.0, &catalog)
            .unwrap();
        assert_eq!(second.status, RequestStatus::NeighborHit);
        assert_eq!(second.source.to_string(), "neighbor(S1, 5.00)");

        // Donor served through its own get
        let donor = constellation.node("S1").unwrap();
        assert_eq!(donor.lock().cache_stats().hits, 1);

        let requester = constellation.node("S2").unwrap();
        assert!(requester.lock().cache_contains("a"));

        let third = constellation
            .request_content("S2", "a", "u2", 2.0, &catalog)
            .unwrap();
        assert_eq!(third.status, RequestStatus::Hit);
    }

    #[test]
    fn test_out_of_range_neighbor_is_ignored() {
        let catalog = catalog();
        let mut constellation = Constellation::new(10.0, 3).unwrap();
        constellation
            .add_node(lru_node("S1"), Position::new(0.0, 0.0, 550.0))
            .unwrap();
        constellation
            .add_node(lru_node("S2"), Position::new(0.0, 0.0, 600.0))
            .unwrap();

        constellation
            .request_content("S1", "b", "u", 0.0, &catalog)
            .unwrap();
        let trace = constellation
            .request_content("S2", "b", "u", 1.0, &catalog)
            .unwrap();
        assert_eq!(trace.status, RequestStatus::Miss);
        assert!(constellation.neighbors("S2").unwrap().is_empty());
    }

    #[test]
    fn test_neighbors_sorted_and_capped() {
        let mut constellation = Constellation::new(1000.0, 2).unwrap();
        for (id, lat) in [("S1", 0.0), ("S2", 30.0), ("S3", 10.0), ("S4", 20.0)] {
            constellation
                .add_node(lru_node(id), Position::new(lat, 0.0, 550.0))
                .unwrap();
        }

        let neighbors = constellation.neighbors("S1").unwrap();
        assert_eq!(
            neighbors,
            vec![("S3".to_string(), 10.0), ("S4".to_string(), 20.0)]
        );
    }

    #[test]
    fn test_busy_donor_is_skipped() {
        let catalog = catalog();
        let constellation = pair();
        constellation
            .request_content("S1", "a", "u", 0.0, &catalog)
            .unwrap();

        let donor = constellation.node("S1").unwrap();
        let guard = donor.lock();
        let trace = constellation
            .request_content("S2", "a", "u", 1.0, &catalog)
            .unwrap();
        drop(guard);

        assert_eq!(trace.status, RequestStatus::Miss);
    }

    #[test]
    fn test_unknown_node() {
        let catalog = catalog();
        let constellation = pair();
        let err = constellation
            .request_content("S9", "a", "u", 0.0, &catalog)
            .unwrap_err();
        assert!(matches!(err, OrbitalError::NodeNotFound(_)));
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut constellation = pair();
        let err = constellation
            .add_node(lru_node("S1"), Position::new(1.0, 1.0, 1.0))
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_leo_layout() {
        let config = ConstellationConfig {
            node_count: 4,
            ..Default::default()
        };
        let constellation = Constellation::leo(
            &config,
            &CacheConfig::default(),
            Arc::new(NetworkMetrics::default()),
        )
        .unwrap();

        assert_eq!(
            constellation.node_ids().collect::<Vec<_>>(),
            vec!["LEO-1", "LEO-2", "LEO-3", "LEO-4"]
        );

        let p2 = constellation.position("LEO-2").unwrap();
        assert_eq!(p2.latitude, 0.0);
        assert_eq!(p2.longitude, 90.0);
        let p4 = constellation.position("LEO-4").unwrap();
        assert_eq!(p4.latitude, 0.0);
        assert_eq!(p4.longitude, 270.0);

        for id in ["LEO-1", "LEO-2", "LEO-3", "LEO-4"] {
            let altitude = constellation.position(id).unwrap().altitude;
            assert!((500.0..=600.0).contains(&altitude));
        }

        // Same seed, same altitudes
        let again = Constellation::leo(
            &config,
            &CacheConfig::default(),
            Arc::new(NetworkMetrics::default()),
        )
        .unwrap();
        assert_eq!(
            again.position("LEO-3").unwrap(),
            constellation.position("LEO-3").unwrap()
        );
    }

    #[test]
    fn test_assign_user_is_stable() {
        let constellation = pair();
        let first = constellation.assign_user("user-7").unwrap().to_string();
        for _ in 0..10 {
            assert_eq!(constellation.assign_user("user-7").unwrap(), first);
        }

        let empty = Constellation::new(1000.0, 3).unwrap();
        assert!(empty.assign_user("user-7").is_err());
    }

    #[test]
    fn test_stats() {
        let catalog = catalog();
        let constellation = pair();
        constellation
            .request_content("S1", "a", "u", 0.0, &catalog)
            .unwrap();
        constellation
            .request_content("S2", "a", "u", 1.0, &catalog)
            .unwrap();
        constellation
            .request_content("S2", "a", "u", 2.0, &catalog)
            .unwrap();
        constellation
            .request_content("S1", "missing", "u", 3.0, &catalog)
            .unwrap();

        let stats = constellation.stats();
        assert_eq!(stats.total_nodes, 2);
        assert_eq!(stats.total_requests, 4);
        assert_eq!(stats.total_hits, 2);
        assert_eq!(stats.total_misses, 1);
        assert_eq!(stats.total_errors, 1);
        assert_eq!(stats.overall_hit_rate, 50.0);
        assert_eq!(stats.inter_node_hits, 1);
        assert_eq!(stats.inter_node_hit_rate, 25.0);
        assert_eq!(stats.strategy, CacheStrategy::Lru);
        assert_eq!(stats.nodes[1].total_requests, 2);
    }

    #[test]
    fn test_mixed_strategies_reported_as_adaptive() {
        let mut constellation = pair();
        let cache = build_policy(CacheStrategy::Fifo, 2, 100).unwrap();
        constellation
            .add_node(
                Node::new("S3", cache, Arc::new(NetworkMetrics::default())),
                Position::new(1.0, 1.0, 550.0),
            )
            .unwrap();
        assert_eq!(constellation.stats().strategy, CacheStrategy::Adaptive);
    }
}
