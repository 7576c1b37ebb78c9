use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::Utc;
use rand::distributions::{Distribution, WeightedIndex};
use serde::Deserialize;

use crate::{
    config::{InteractionRules, LoggingConfig},
    error::SimError,
    grid::Grid,
    rng::{RngManager, LAYOUT_STREAM},
    species::SpeciesId,
    world::World,
};

fn default_rows() -> usize {
    50
}

fn default_cols() -> usize {
    50
}

fn default_snapshot_interval_rounds() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    /// Absent means "seed from the wall clock".
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_rows")]
    pub rows: usize,
    #[serde(default = "default_cols")]
    pub cols: usize,
    #[serde(default)]
    pub rounds: Option<u64>,
    #[serde(default = "default_snapshot_interval_rounds")]
    pub snapshot_interval_rounds: u64,
    #[serde(default)]
    pub initial: InitialLayout,
    #[serde(default)]
    pub rules: InteractionRules,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How the starting grid is populated.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InitialLayout {
    /// Each cell independently takes one of the six species codes.
    #[default]
    Uniform,
    /// Each cell independently takes a species with the given relative weight.
    Weighted { weights: BTreeMap<SpeciesId, f64> },
    /// Fixed rows of species symbols.
    Explicit { cells: Vec<String> },
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn build_world(&self, seed: u64) -> Result<World> {
        let mut rng = RngManager::new(seed);
        let mut layout = rng.stream(LAYOUT_STREAM);
        let grid = match &self.initial {
            InitialLayout::Uniform => Grid::random_uniform(self.rows, self.cols, &mut layout)?,
            InitialLayout::Weighted { weights } => {
                let table: Vec<f64> = SpeciesId::ALL
                    .iter()
                    .map(|id| weights.get(id).copied().unwrap_or(0.0))
                    .collect();
                let dist = WeightedIndex::new(&table)
                    .with_context(|| format!("invalid species weights in '{}'", self.name))?;
                let cells = (0..self.rows * self.cols)
                    .map(|_| SpeciesId::ALL[dist.sample(&mut layout)])
                    .collect();
                Grid::from_cells(self.rows, self.cols, cells)?
            }
            InitialLayout::Explicit { cells } => {
                let grid = Grid::from_rows(cells.as_slice())?;
                if grid.rows() != self.rows || grid.cols() != self.cols {
                    let err = SimError::InvalidGridDimensions {
                        rows: grid.rows(),
                        cols: grid.cols(),
                    };
                    return Err(anyhow::Error::new(err).context(format!(
                        "layout of '{}' does not match declared {}x{}",
                        self.name, self.rows, self.cols
                    )));
                }
                grid
            }
        };
        Ok(World::new(grid))
    }

    pub fn rounds(&self, override_rounds: Option<u64>) -> u64 {
        override_rounds.or(self.rounds).unwrap_or(100)
    }

    pub fn seed(&self, override_seed: Option<u64>) -> u64 {
        override_seed
            .or(self.seed)
            .unwrap_or_else(|| Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64)
    }
}
