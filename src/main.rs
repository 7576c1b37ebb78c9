use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dinogrid::{
    engine::{EngineBuilder, EngineSettings},
    scenario::ScenarioLoader,
    snapshot::PopulationHistory,
    systems::{MovementSystem, UpdateSystem},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Predator/prey grid ecosystem runner")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/jurassic_valley.yaml")]
    scenario: PathBuf,

    /// Override round count (uses scenario default when omitted)
    #[arg(long)]
    rounds: Option<u64>,

    /// Override the random seed (scenario seed, else wall clock)
    #[arg(long)]
    seed: Option<u64>,

    /// Override snapshot interval in rounds
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Directory for snapshots
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Write the per-round population history to this JSON file
    #[arg(long)]
    history: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    let scenario = loader.load(&cli.scenario)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&scenario.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let seed = scenario.seed(cli.seed);
    let rounds = scenario.rounds(cli.rounds);
    info!(scenario = %scenario.name, seed, "seed selected");

    let mut world = scenario.build_world(seed)?;
    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        seed,
        snapshot_interval_rounds: cli
            .snapshot_interval
            .unwrap_or(scenario.snapshot_interval_rounds),
        snapshot_dir: cli
            .snapshot_dir
            .unwrap_or_else(|| PathBuf::from("snapshots")),
        summary_interval_rounds: scenario.logging.summary_interval_rounds,
    };

    let mut engine = EngineBuilder::new(settings)
        .with_system(UpdateSystem::new(scenario.rules))
        .with_system(MovementSystem::new())
        .build();

    let mut history = PopulationHistory::new(&scenario.name, seed, &world);
    engine.run_with_hook(&mut world, rounds, |summary| {
        history.record(summary.round, summary.counts)
    })?;

    if let Some(path) = &cli.history {
        history.write(path)?;
        info!(path = %path.display(), "population history written");
    }

    println!(
        "Scenario '{}' completed {} rounds with seed {}. Creatures remaining: {}",
        scenario.name,
        rounds,
        seed,
        world.total_creatures()
    );
    Ok(())
}
