use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{grid::PopulationCounts, world::World};

/// Writes a JSON grid snapshot every `interval` rounds; 0 disables it.
pub struct SnapshotWriter {
    dir: PathBuf,
    interval: u64,
}

impl SnapshotWriter {
    pub fn new(dir: &Path, interval: u64) -> Self {
        Self {
            dir: dir.to_path_buf(),
            interval,
        }
    }

    pub fn maybe_write(&self, world: &World, scenario: &str) -> Result<Option<PathBuf>> {
        if self.interval == 0 || world.round() % self.interval != 0 {
            return Ok(None);
        }
        let dir = self.dir.join(scenario);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create snapshot dir {}", dir.display()))?;
        let path = dir.join(format!("round_{:06}.json", world.round()));
        let json = serde_json::to_string_pretty(&world.snapshot(scenario))?;
        fs::write(&path, json)
            .with_context(|| format!("failed to write snapshot {}", path.display()))?;
        Ok(Some(path))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryPoint {
    pub round: u64,
    pub counts: PopulationCounts,
}

/// Per-round population counts for external plotting.
#[derive(Debug, Clone, Serialize)]
pub struct PopulationHistory {
    pub scenario: String,
    pub seed: u64,
    pub rows: usize,
    pub cols: usize,
    pub generated_at: DateTime<Utc>,
    pub rounds: Vec<HistoryPoint>,
}

impl PopulationHistory {
    /// Starts a history with the world's current counts as its first point.
    pub fn new(scenario: &str, seed: u64, world: &World) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            rows: world.grid().rows(),
            cols: world.grid().cols(),
            generated_at: Utc::now(),
            rounds: vec![HistoryPoint {
                round: world.round(),
                counts: world.counts(),
            }],
        }
    }

    pub fn record(&mut self, round: u64, counts: PopulationCounts) {
        self.rounds.push(HistoryPoint { round, counts });
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}
