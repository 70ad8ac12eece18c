//! orbital-cdn - Satellite content-delivery simulation.
//!
//! Models a constellation of low-orbit satellites acting as CDN nodes. Each
//! node caches content under a configurable eviction policy, serves hits from
//! its cache, asks neighbouring satellites on a miss and otherwise fetches
//! from a ground station. Transfers are not performed; their latency is
//! computed from link characteristics.
//!
//! # Features
//!
//! - **Eviction policies**: LRU, LFU, FIFO and an adaptive policy that
//!   re-selects among them from windowed hit rates.
//! - **Request traces**: every request produces a timed, step-by-step trace.
//! - **Neighbour lookup**: misses are resolved from the nearest satellites
//!   before the ground station is contacted.
//! - **Reproducible workloads**: a seeded discrete-event driver generates
//!   popularity-weighted traffic.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        orbital-cdn                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Driver: Simulation | Event queue | Report                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Topology: Constellation | Neighbour lookup                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Node: Request pipeline | Delivery model | Catalog          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Cache: LRU | LFU | FIFO | Adaptive                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use orbital_cdn::config::SimulationConfig;
//!
//! fn main() -> orbital_cdn::Result<()> {
//!     let report = orbital_cdn::run(SimulationConfig::development())?;
//!     println!("hit rate: {:.1}%", report.hit_rate());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod types;

pub mod cache;
pub mod catalog;
pub mod constellation;
pub mod delivery;
pub mod node;
pub mod simulation;

pub mod cli;
pub mod observability;

pub use cache::{build_policy, CachePolicy, CacheStats, CacheStrategy};
pub use catalog::{ContentCatalog, InMemoryCatalog};
pub use config::SimulationConfig;
pub use constellation::{Constellation, ConstellationStats, Position};
pub use delivery::{DeliverySource, NetworkMetrics};
pub use error::{OrbitalError, Result};
pub use node::{Node, NodeStatistics, RequestStatus, RequestTrace};
pub use simulation::{Simulation, SimulationReport};
pub use types::{ContentId, ContentItem, ContentType, NodeId, SimTime};

use tracing::info;

/// Run a simulation over the built-in catalog.
///
/// Logging is not initialized here; call [`observability::init`] first if
/// events should be printed.
pub fn run(config: SimulationConfig) -> Result<SimulationReport> {
    info!(
        strategy = %config.cache.strategy,
        nodes = config.node_count(),
        "Starting orbital-cdn simulation"
    );

    let mut simulation = Simulation::new(config, InMemoryCatalog::realistic())?;
    simulation.run()
}
