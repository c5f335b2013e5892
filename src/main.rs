mod config;
mod sim;
mod terrain;

use clap::Parser;
use std::error::Error;
use std::path::PathBuf;

use config::{HarnessConfig, load_harness_config};
use sim::Sim;

#[derive(Parser, Debug)]
#[command(name = "scout", about = "Drive the world caches through a generated world")]
struct Args {
    /// TOML config with [sim], [scan], [entities] and [containers] sections
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of ticks to simulate (overrides the config)
    #[arg(long)]
    steps: Option<u64>,
    /// Terrain seed (overrides the config)
    #[arg(long)]
    seed: Option<i32>,
    /// Scan radius in blocks (overrides the config)
    #[arg(long)]
    radius: Option<i32>,
    /// Block types to track, repeatable (replaces the configured list)
    #[arg(long = "track")]
    track: Vec<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => {
            let cfg = load_harness_config(path)?;
            log::info!("loaded config from {}", path.display());
            cfg
        }
        None => HarnessConfig::default(),
    };
    if let Some(steps) = args.steps {
        cfg.sim.steps = steps;
    }
    if let Some(seed) = args.seed {
        cfg.sim.seed = seed;
    }
    if let Some(radius) = args.radius {
        cfg.caches.scan.radius = radius;
    }
    if !args.track.is_empty() {
        cfg.sim.tracked = args.track.clone();
    }
    cfg.caches.validate()?;

    let mut sim = Sim::new(&cfg);
    let summary = sim.run();
    log::info!(
        "done ticks={} scans={} events={} mined={} unreachable={} arrows={} containers={}",
        summary.ticks,
        summary.scans_completed,
        summary.events_applied,
        summary.blocks_mined,
        summary.marked_unreachable,
        summary.arrows_fired,
        summary.containers_cached
    );
    Ok(())
}
