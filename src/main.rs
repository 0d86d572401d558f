use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use log::*;

use tilecs::{
    components,
    config::Config,
    ecs::EntityWorld,
    engine::{EngineBuilder, EngineSettings},
    report::WorldReport,
    spatial::ChunkMap,
    systems::{LifetimeSystem, MovementSystem, SpawnSystem},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Runs a tile world simulation on the ECS")]
struct Cli {
    /// Path to the YAML config (built-in sandbox when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override tick count
    #[arg(long)]
    ticks: Option<u64>,

    /// Write a JSON world report here when the run finishes
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `tilecs::ecs=trace`
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_yaml(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::sandbox(),
    };

    let filter = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    pretty_env_logger::formatted_builder()
        .format_timestamp(None)
        .parse_filters(filter)
        .init();

    info!("tilecs {} running `{}`", tilecs::crash::VERSION, config.name);

    let mut world = EntityWorld::new(&config.ecs);
    components::register_all(&mut world)?;

    let chunks = Rc::new(RefCell::new(ChunkMap::new(&config.spatial)));
    anyhow::ensure!(
        ChunkMap::install(&chunks, &mut world),
        "failed to install the chunk map"
    );

    let mut engine = EngineBuilder::new(EngineSettings::from_config(&config))
        .with_system(SpawnSystem::new(&config.simulation))
        .with_system(MovementSystem::new(
            Rc::clone(&chunks),
            config.simulation.world_extent,
        ))
        .with_system(LifetimeSystem::new())
        .build();

    let ticks = cli.ticks.unwrap_or(config.simulation.ticks);
    let mut slowest = 0.0f64;
    engine.run_with_hook(&mut world, ticks, |summary, _| {
        slowest = slowest.max(summary.total_ms());
    })?;

    info!(
        "`{}` completed {} ticks: {} entities live, {} chunks occupied, slowest tick {:.3} ms",
        config.name,
        ticks,
        world.entity_count(),
        chunks.borrow().chunk_count(),
        slowest
    );

    if let Some(path) = &cli.report {
        WorldReport::capture(&config.name, engine.current_tick(), &world).write(path)?;
        info!("wrote report to {}", path.display());
    }
    Ok(())
}
