//! Command-line interface for orbital-cdn.

use crate::cache::CacheStrategy;
use crate::config::{ConstellationConfig, SimulationConfig};
use crate::error::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// orbital-cdn - Satellite CDN caching and delivery simulation.
#[derive(Parser)]
#[command(name = "orbital-cdn")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, env = "ORBITAL_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true, env = "ORBITAL_JSON_LOGS")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run a generated workload and print the report
    Simulate(SimulateArgs),

    /// Send a fixed sequence of requests to a single node
    Request {
        /// Content ids, requested in order
        #[arg(required = true)]
        content_ids: Vec<String>,

        /// Caching strategy (LRU, LFU, FIFO, ADAPTIVE)
        #[arg(short, long, default_value = "LRU")]
        strategy: String,

        /// Cache capacity in items
        #[arg(short = 'n', long, default_value_t = 10)]
        capacity: usize,

        /// Requesting user
        #[arg(short, long, default_value = "user_1")]
        user: String,
    },

    /// List the built-in content catalog
    Catalog {
        /// Only items whose title or description contains this text
        #[arg(short, long)]
        search: Option<String>,

        /// Only the N most popular items
        #[arg(short, long)]
        top: Option<usize>,
    },
}

/// Options of the `simulate` command. Flags override the configuration file.
#[derive(Args, Debug, Clone, Default)]
pub struct SimulateArgs {
    /// Configuration file path (JSON)
    #[arg(short, long, env = "ORBITAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Caching strategy (LRU, LFU, FIFO, ADAPTIVE)
    #[arg(short, long)]
    pub strategy: Option<String>,

    /// Cache capacity in items
    #[arg(short = 'n', long)]
    pub capacity: Option<usize>,

    /// Number of satellites; more than one enables neighbour lookup
    #[arg(long)]
    pub nodes: Option<usize>,

    /// Simulated seconds
    #[arg(short, long)]
    pub duration: Option<f64>,

    /// Workload seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl SimulateArgs {
    /// Loads the configuration file, if any, and applies the flag overrides.
    pub fn load_config(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_file(path)?,
            None => SimulationConfig::default(),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&self, config: &mut SimulationConfig) {
        if let Some(strategy) = &self.strategy {
            config.cache.strategy = CacheStrategy::from_name_or_default(strategy);
        }
        if let Some(capacity) = self.capacity {
            config.cache.capacity = capacity;
        }
        if let Some(duration) = self.duration {
            config.workload.duration = duration;
        }
        if let Some(seed) = self.seed {
            config.workload.seed = seed;
        }
        match self.nodes {
            Some(0) | Some(1) => config.constellation = None,
            Some(count) => {
                let layout = config
                    .constellation
                    .get_or_insert_with(ConstellationConfig::default);
                layout.node_count = count;
            }
            None => {}
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
