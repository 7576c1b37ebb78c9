use serde::Serialize;

use crate::{
    grid::{Grid, PopulationCounts},
    registry::{TamedEntry, TamedRegistry},
    systems::UpdateTally,
};

/// What the systems did during the round in progress.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RoundLog {
    pub update: UpdateTally,
    pub relocations: usize,
}

#[derive(Debug, Serialize)]
pub struct WorldSnapshot {
    pub scenario: String,
    pub round: u64,
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<String>,
    pub counts: PopulationCounts,
    pub tamed: Vec<TamedEntry>,
}

/// Simulation state carried between rounds: the grid buffer, the tamed
/// registry and the round counter.
#[derive(Debug)]
pub struct World {
    round: u64,
    pub(crate) grid: Grid,
    pub(crate) registry: TamedRegistry,
    pub(crate) log: RoundLog,
}

impl World {
    pub fn new(grid: Grid) -> Self {
        Self::with_registry(grid, TamedRegistry::new())
    }

    pub fn with_registry(grid: Grid, registry: TamedRegistry) -> Self {
        Self {
            round: 0,
            grid,
            registry,
            log: RoundLog::default(),
        }
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub(crate) fn begin_round(&mut self) {
        self.log = RoundLog::default();
    }

    pub(crate) fn advance_round(&mut self) {
        self.round += 1;
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Hands the grid to a system by value, leaving a placeholder until the
    /// system puts the next grid back.
    pub(crate) fn take_grid(&mut self) -> Grid {
        std::mem::replace(&mut self.grid, Grid::placeholder())
    }

    pub fn registry(&self) -> &TamedRegistry {
        &self.registry
    }

    pub fn last_round_log(&self) -> RoundLog {
        self.log
    }

    pub fn counts(&self) -> PopulationCounts {
        self.grid.counts()
    }

    pub fn total_creatures(&self) -> usize {
        self.counts().creatures()
    }

    pub fn snapshot(&self, scenario: &str) -> WorldSnapshot {
        WorldSnapshot {
            scenario: scenario.to_string(),
            round: self.round,
            rows: self.grid.rows(),
            cols: self.grid.cols(),
            cells: self.grid.to_rows(),
            counts: self.counts(),
            tamed: self.registry.entries(),
        }
    }
}
