//! Discrete-event simulation driver.
//!
//! A [`Simulation`] owns everything a run needs: the catalog, the network
//! metrics and either a single node or a constellation. [`Simulation::run`]
//! processes a time-ordered queue of events until the configured duration:
//!
//! - every user issues one request per `request_interval`, choosing content
//!   with probability proportional to its popularity
//! - a monitor samples every node's performance per `log_interval`
//!
//! Events with equal timestamps run in the order they were scheduled. The
//! random source is seeded from the configuration, so a run is reproducible.

mod report;

pub use self::report::{SimulationReport, StatusCounts};

use crate::cache::build_policy;
use crate::catalog::InMemoryCatalog;
use crate::config::SimulationConfig;
use crate::constellation::Constellation;
use crate::delivery::NetworkMetrics;
use crate::error::{OrbitalError, Result};
use crate::node::{NoNeighbors, Node, NodeStatistics, RequestTrace};
use crate::types::{ContentId, SimTime};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use tracing::{debug, info};

/// Node id used when the run has no constellation.
pub const SINGLE_NODE_ID: &str = "LEO-1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    UserRequest { user: usize },
    Monitor,
}

#[derive(Debug, Clone, Copy)]
struct Event {
    time: SimTime,
    seq: u64,
    kind: EventKind,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    // Reversed so the max-heap pops the earliest event, then the earliest
    // scheduled among equal times.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-ordered event queue with stable ties.
#[derive(Debug, Default)]
struct EventQueue {
    heap: BinaryHeap<Event>,
    next_seq: u64,
}

impl EventQueue {
    fn schedule(&mut self, time: SimTime, kind: EventKind) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Event { time, seq, kind });
    }

    fn pop(&mut self) -> Option<Event> {
        self.heap.pop()
    }
}

enum Topology {
    Single(Node),
    Constellation(Constellation),
}

/// A configured simulation run.
pub struct Simulation {
    config: SimulationConfig,
    catalog: InMemoryCatalog,
    topology: Topology,
    /// Content ids aligned with `weights`.
    choices: Vec<ContentId>,
    weights: WeightedIndex<f64>,
    rng: StdRng,
    clock: SimTime,
    status_counts: StatusCounts,
}

impl Simulation {
    /// Validates the configuration and builds the nodes.
    pub fn new(config: SimulationConfig, catalog: InMemoryCatalog) -> Result<Self> {
        config.validate()?;

        let metrics = Arc::new(config.network.clone());
        let topology = match &config.constellation {
            Some(layout) => Topology::Constellation(Constellation::leo(
                layout,
                &config.cache,
                Arc::clone(&metrics),
            )?),
            None => Topology::Single(single_node(&config, metrics)?),
        };

        let choices: Vec<ContentId> = catalog
            .items()
            .iter()
            .map(|item| item.content_id.clone())
            .collect();
        let weights = WeightedIndex::new(catalog.items().iter().map(|item| item.popularity))
            .map_err(|e| {
                OrbitalError::Config(format!("catalog cannot drive a workload: {}", e))
            })?;

        Ok(Self {
            rng: StdRng::seed_from_u64(config.workload.seed),
            config,
            catalog,
            topology,
            choices,
            weights,
            clock: 0.0,
            status_counts: StatusCounts::default(),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn catalog(&self) -> &InMemoryCatalog {
        &self.catalog
    }

    /// Current virtual time.
    pub fn clock(&self) -> SimTime {
        self.clock
    }

    pub fn status_counts(&self) -> StatusCounts {
        self.status_counts
    }

    /// The constellation, if the run has one.
    pub fn constellation(&self) -> Option<&Constellation> {
        match &self.topology {
            Topology::Constellation(constellation) => Some(constellation),
            Topology::Single(_) => None,
        }
    }

    /// Issues one request at the current time and advances the clock by its
    /// delivery time. In a constellation the user is routed to its assigned
    /// node.
    pub fn request(&mut self, content_id: &str, user_id: &str) -> Result<RequestTrace> {
        let node_id = self.route(user_id)?;
        self.request_at(&node_id, content_id, user_id)
    }

    /// Like [`Simulation::request`] but on an explicit node.
    pub fn request_at(
        &mut self,
        node_id: &str,
        content_id: &str,
        user_id: &str,
    ) -> Result<RequestTrace> {
        let trace = self.dispatch(node_id, content_id, user_id, self.clock)?;
        self.clock += trace.delivery_time;
        Ok(trace)
    }

    /// Node serving a user.
    fn route(&self, user_id: &str) -> Result<String> {
        match &self.topology {
            Topology::Single(node) => Ok(node.id().to_string()),
            Topology::Constellation(constellation) => {
                constellation.assign_user(user_id).map(str::to_string)
            }
        }
    }

    fn dispatch(
        &mut self,
        node_id: &str,
        content_id: &str,
        user_id: &str,
        now: SimTime,
    ) -> Result<RequestTrace> {
        let trace = match &mut self.topology {
            Topology::Single(node) => {
                if node.id() != node_id {
                    return Err(OrbitalError::NodeNotFound(node_id.to_string()));
                }
                node.request_content(content_id, user_id, now, &self.catalog, &mut NoNeighbors)?
            }
            Topology::Constellation(constellation) => {
                constellation.request_content(node_id, content_id, user_id, now, &self.catalog)?
            }
        };
        self.status_counts.record(trace.status);
        Ok(trace)
    }

    /// Samples every node's performance at the current time.
    pub fn log_performance(&mut self) {
        let now = self.clock;
        match &mut self.topology {
            Topology::Single(node) => {
                node.log_performance(now);
            }
            Topology::Constellation(constellation) => constellation.log_performance(now),
        }
        debug!(time = now, "Performance sampled");
    }

    /// Runs the generated workload to completion and returns the report.
    pub fn run(&mut self) -> Result<SimulationReport> {
        let workload = self.config.workload.clone();
        let start = self.clock;
        let end = start + workload.duration;

        info!(
            strategy = %self.config.cache.strategy,
            capacity = self.config.cache.capacity,
            nodes = self.config.node_count(),
            users = workload.user_count,
            duration = workload.duration,
            "Simulation started"
        );

        let mut queue = EventQueue::default();
        for user in 0..workload.user_count {
            queue.schedule(start, EventKind::UserRequest { user });
        }
        queue.schedule(start, EventKind::Monitor);

        while let Some(event) = queue.pop() {
            if event.time >= end {
                break;
            }
            self.clock = event.time;

            match event.kind {
                EventKind::UserRequest { user } => {
                    let user_id = format!("user_{}", user + 1);
                    let content_id = self.choices[self.weights.sample(&mut self.rng)].clone();
                    // Generated requests run at their event time and do not
                    // move the clock
                    let node_id = self.route(&user_id)?;
                    self.dispatch(&node_id, &content_id, &user_id, event.time)?;
                    queue.schedule(event.time + workload.request_interval, event.kind);
                }
                EventKind::Monitor => {
                    self.log_performance();
                    queue.schedule(event.time + workload.log_interval, event.kind);
                }
            }
        }
        self.clock = end;

        let counts = self.status_counts;
        info!(
            requests = counts.total(),
            hits = counts.hit,
            neighbor_hits = counts.neighbor_hit,
            misses = counts.miss,
            errors = counts.error,
            "Simulation finished"
        );

        Ok(self.report())
    }

    pub fn node_statistics(&self) -> Vec<NodeStatistics> {
        match &self.topology {
            Topology::Single(node) => vec![node.statistics()],
            Topology::Constellation(constellation) => constellation.node_statistics(),
        }
    }

    /// Request traces of every node, in arrival order.
    pub fn request_log(&self) -> Vec<RequestTrace> {
        let mut traces = match &self.topology {
            Topology::Single(node) => node.request_log().to_vec(),
            Topology::Constellation(constellation) => constellation.request_log(),
        };
        traces.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        traces
    }

    pub fn report(&self) -> SimulationReport {
        SimulationReport::new(
            &self.config,
            self.clock,
            self.status_counts,
            self.node_statistics(),
            self.constellation().map(Constellation::stats),
        )
    }
}

fn single_node(config: &SimulationConfig, metrics: Arc<NetworkMetrics>) -> Result<Node> {
    let policy = build_policy(
        config.cache.strategy,
        config.cache.capacity,
        config.cache.evaluation_window,
    )?;
    Ok(Node::new(SINGLE_NODE_ID, policy, metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConstellationConfig, WorkloadConfig};
    use crate::node::RequestStatus;
    use crate::types::{ContentItem, ContentType};

    fn small_catalog() -> InMemoryCatalog {
        InMemoryCatalog::from_items([
            ContentItem::new("a", ContentType::Video, 10.0),
            ContentItem::new("b", ContentType::Image, 5.0),
            ContentItem::new("c", ContentType::Document, 8.0),
            ContentItem::new("d", ContentType::Audio, 2.0),
        ])
    }

    #[test]
    fn test_event_queue_order() {
        let mut queue = EventQueue::default();
        queue.schedule(5.0, EventKind::Monitor);
        queue.schedule(1.0, EventKind::UserRequest { user: 0 });
        queue.schedule(1.0, EventKind::UserRequest { user: 1 });
        queue.schedule(0.5, EventKind::Monitor);

        let order: Vec<_> = std::iter::from_fn(|| queue.pop())
            .map(|e| (e.time, e.kind))
            .collect();
        assert_eq!(
            order,
            vec![
                (0.5, EventKind::Monitor),
                (1.0, EventKind::UserRequest { user: 0 }),
                (1.0, EventKind::UserRequest { user: 1 }),
                (5.0, EventKind::Monitor),
            ]
        );
    }

    #[test]
    fn test_request_advances_clock() {
        let mut config = SimulationConfig::default();
        config.cache.capacity = 3;
        let mut sim = Simulation::new(config, small_catalog()).unwrap();

        let trace = sim.request("a", "user_1").unwrap();
        assert_eq!(trace.timestamp, 0.0);
        assert_eq!(sim.clock(), trace.delivery_time);

        let second = sim.request("a", "user_1").unwrap();
        assert_eq!(second.status, RequestStatus::Hit);
        assert_eq!(second.timestamp, trace.delivery_time);

        let error = sim.request("zzz", "user_1").unwrap();
        assert_eq!(error.status, RequestStatus::Error);
        assert_eq!(sim.clock(), trace.delivery_time + second.delivery_time);
    }

    #[test]
    fn test_run_counts_every_request() {
        let config = SimulationConfig {
            workload: WorkloadConfig {
                duration: 30.0,
                request_interval: 3.0,
                user_count: 2,
                log_interval: 10.0,
                seed: 1,
            },
            ..Default::default()
        };
        let mut sim = Simulation::new(config, InMemoryCatalog::realistic()).unwrap();
        let report = sim.run().unwrap();

        // Requests at 0, 3, ..., 27 for each user
        assert_eq!(report.status_counts.total(), 20);
        assert_eq!(report.status_counts.error, 0);
        assert_eq!(report.nodes.len(), 1);
        assert_eq!(report.nodes[0].total_requests, 20);
        assert_eq!(sim.clock(), 30.0);

        // Samples at 0, 10 and 20
        let samples = match &sim.topology {
            Topology::Single(node) => node.performance_log().len(),
            Topology::Constellation(_) => unreachable!(),
        };
        assert_eq!(samples, 3);
    }

    #[test]
    fn test_run_is_deterministic() {
        let run = |seed| {
            let mut config = SimulationConfig::development();
            config.workload.seed = seed;
            let mut sim = Simulation::new(config, InMemoryCatalog::realistic()).unwrap();
            sim.run().unwrap();
            sim.request_log()
                .into_iter()
                .map(|t| (t.node_id, t.content_id, t.status))
                .collect::<Vec<_>>()
        };

        assert_eq!(run(9), run(9));
        assert!(!run(9).is_empty());
    }

    #[test]
    fn test_constellation_run() {
        let config = SimulationConfig {
            constellation: Some(ConstellationConfig {
                node_count: 3,
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut sim = Simulation::new(config, InMemoryCatalog::realistic()).unwrap();
        let report = sim.run().unwrap();

        let constellation = report.constellation.expect("constellation stats");
        assert_eq!(constellation.total_nodes, 3);
        assert_eq!(constellation.total_requests, report.status_counts.total());
        assert_eq!(report.nodes.len(), 3);
    }

    #[test]
    fn test_unknown_node_rejected() {
        let mut sim = Simulation::new(SimulationConfig::default(), small_catalog()).unwrap();
        assert!(matches!(
            sim.request_at("LEO-9", "a", "u"),
            Err(OrbitalError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_empty_catalog_rejected() {
        let result = Simulation::new(SimulationConfig::default(), InMemoryCatalog::new());
        assert!(result.err().unwrap().is_config());
    }
}
