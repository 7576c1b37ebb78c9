use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use tracing::{debug, info};

use crate::{
    grid::PopulationCounts,
    rng::{RngManager, SystemRng, ROUND_STREAM},
    snapshot::SnapshotWriter,
    species::SpeciesId,
    systems::UpdateTally,
    world::World,
};

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
    pub snapshot_interval_rounds: u64,
    pub snapshot_dir: PathBuf,
    /// Rounds between info-level population summaries; 0 disables them.
    pub summary_interval_rounds: u64,
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            rng: RngManager::new(self.settings.seed),
            systems: self.systems,
            snapshot_writer: SnapshotWriter::new(
                &self.settings.snapshot_dir,
                self.settings.snapshot_interval_rounds,
            ),
            settings: self.settings,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RoundSummary {
    pub round: u64,
    pub counts: PopulationCounts,
    pub tamed: usize,
    pub update: UpdateTally,
    pub relocations: usize,
    pub snapshot_path: Option<PathBuf>,
}

/// Round driver. Every system of every round draws from one shared stream,
/// in registration order, so a seed fully determines a run.
pub struct Engine {
    rng: RngManager,
    systems: Vec<Box<dyn System>>,
    snapshot_writer: SnapshotWriter,
    settings: EngineSettings,
}

impl Engine {
    pub fn run(&mut self, world: &mut World, rounds: u64) -> Result<()> {
        self.run_with_hook(world, rounds, |_| {})
    }

    pub fn run_with_hook<F>(&mut self, world: &mut World, rounds: u64, mut hook: F) -> Result<()>
    where
        F: FnMut(&RoundSummary),
    {
        info!(
            scenario = %self.settings.scenario_name,
            seed = self.settings.seed,
            rows = world.grid().rows(),
            cols = world.grid().cols(),
            rounds,
            "starting run"
        );
        let cells = world.grid().rows() * world.grid().cols();
        for _ in 0..rounds {
            let summary = self.step(world, cells)?;
            hook(&summary);
        }
        info!(
            scenario = %self.settings.scenario_name,
            round = world.round(),
            creatures = world.total_creatures(),
            "run complete"
        );
        Ok(())
    }

    /// Runs one round. `cells` is the grid size the run started with.
    fn step(&mut self, world: &mut World, cells: usize) -> Result<RoundSummary> {
        let round = world.round() + 1;
        world.begin_round();
        for system in &mut self.systems {
            let mut rng_stream = self.rng.stream(ROUND_STREAM);
            let ctx = SystemContext {
                round,
                scenario_name: &self.settings.scenario_name,
            };
            system
                .run(&ctx, world, &mut rng_stream)
                .with_context(|| format!("system '{}' failed in round {round}", system.name()))?;
        }
        world.advance_round();

        let counts = world.counts();
        ensure!(
            counts.total() == cells,
            "round {round}: species counts sum to {} on a grid of {cells} cells",
            counts.total()
        );

        let snapshot_path = self
            .snapshot_writer
            .maybe_write(world, &self.settings.scenario_name)?;
        let log = world.last_round_log();
        let summary = RoundSummary {
            round,
            counts,
            tamed: world.registry().len(),
            update: log.update,
            relocations: log.relocations,
            snapshot_path,
        };

        let interval = self.settings.summary_interval_rounds;
        if interval > 0 && round % interval == 0 {
            info!(
                round,
                vegetation = counts.get(SpeciesId::Vegetation),
                triceratops = counts.get(SpeciesId::Triceratops),
                brachiosaurus = counts.get(SpeciesId::Brachiosaurus),
                velociraptor = counts.get(SpeciesId::Velociraptor),
                t_rex = counts.get(SpeciesId::TRex),
                human = counts.get(SpeciesId::Human),
                tamed = summary.tamed,
                "population"
            );
        } else {
            debug!(round, creatures = counts.creatures(), "round complete");
        }
        Ok(summary)
    }
}

pub struct SystemContext<'a> {
    pub round: u64,
    pub scenario_name: &'a str,
}

pub trait System {
    fn name(&self) -> &str;
    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()>;
}
