//! orbital-cdn CLI - Main entry point.

use anyhow::Context;
use orbital_cdn::cli::{Cli, Commands};
use orbital_cdn::config::{CacheConfig, ObservabilityConfig, SimulationConfig};
use orbital_cdn::{observability, CacheStrategy, InMemoryCatalog, Simulation};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    observability::init(&ObservabilityConfig {
        log_level: cli.log_level.clone(),
        json_logs: cli.json_logs,
    })?;

    match cli.command {
        Commands::Simulate(args) => {
            let config = args.load_config()?;
            let report = orbital_cdn::run(config)?;
            let json = report.to_json_pretty()?;

            match &args.output {
                Some(path) => {
                    std::fs::write(path, json)
                        .with_context(|| format!("writing report to {}", path.display()))?;
                    println!(
                        "Report {} written to {} ({} requests, {:.1}% served from orbit)",
                        report.run_id,
                        path.display(),
                        report.status_counts.total(),
                        report.hit_rate()
                    );
                }
                None => println!("{}", json),
            }
        }

        Commands::Request {
            content_ids,
            strategy,
            capacity,
            user,
        } => {
            let config = SimulationConfig {
                cache: CacheConfig {
                    capacity,
                    strategy: CacheStrategy::from_name_or_default(&strategy),
                    ..Default::default()
                },
                ..Default::default()
            };
            let mut simulation = Simulation::new(config, InMemoryCatalog::realistic())?;

            for content_id in &content_ids {
                let trace = simulation.request(content_id, &user)?;
                println!(
                    "{:>9.3}s  {:<28} {:<12} {:>9.3}s  {}",
                    trace.timestamp,
                    trace.content_id,
                    trace.status,
                    trace.delivery_time,
                    trace.source
                );
            }

            let stats = simulation.node_statistics();
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }

        Commands::Catalog { search, top } => {
            let catalog = InMemoryCatalog::realistic();
            let items = match (search, top) {
                (Some(query), _) => catalog.search(&query),
                (None, Some(limit)) => catalog.most_popular(limit),
                (None, None) => catalog.items().to_vec(),
            };

            for item in items {
                println!(
                    "{:<28} {:<12} {:>8.1} MB  {:.2}  {}",
                    item.content_id, item.content_type, item.size_mb, item.popularity, item.title
                );
            }
        }
    }

    Ok(())
}
