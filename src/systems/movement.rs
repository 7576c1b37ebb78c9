//! Stochastic relocation of creatures into adjacent vegetation.

use anyhow::Result;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, debug_span};

use crate::{
    engine::{System, SystemContext},
    grid::{Grid, Position},
    rng::SystemRng,
    species::{self, SpeciesId},
    world::World,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Relocation {
    pub species: SpeciesId,
    pub from: Position,
    pub to: Position,
}

pub fn relocate<R: Rng + ?Sized>(grid: Grid, rng: &mut R) -> Grid {
    relocate_traced(grid, rng).0
}

/// Moves creatures in a shuffled order. Destinations are chosen from the
/// grid as already changed by earlier moves in this pass; a cell that has
/// received a creature takes no second one and its newcomer does not move
/// again.
pub fn relocate_traced<R: Rng + ?Sized>(grid: Grid, rng: &mut R) -> (Grid, Vec<Relocation>) {
    let mut order = grid.occupied();
    order.shuffle(rng);

    let mut next = grid;
    let mut moved = vec![false; next.len()];
    let mut log = Vec::new();
    for pos in order {
        if moved[next.index(pos)] {
            continue;
        }
        let occupant = next.get(pos);
        let Ok(stats) = species::stats_for(occupant) else {
            continue;
        };
        if !species::moves(stats, rng) {
            continue;
        }
        let open: Vec<Position> = next
            .neighbors(pos)
            .iter()
            .filter(|n| n.occupant.is_vegetation() && !moved[next.index(n.pos)])
            .map(|n| n.pos)
            .collect();
        let Some(&dest) = open.choose(rng) else {
            continue;
        };
        next.set(pos, SpeciesId::Vegetation);
        next.set(dest, occupant);
        moved[next.index(dest)] = true;
        log.push(Relocation {
            species: occupant,
            from: pos,
            to: dest,
        });
    }
    debug!(moves = log.len(), "movement resolved");
    (next, log)
}

pub struct MovementSystem;

impl MovementSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MovementSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for MovementSystem {
    fn name(&self) -> &str {
        "movement"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let _span =
            debug_span!("movement", scenario = ctx.scenario_name, round = ctx.round).entered();
        let grid = world.take_grid();
        let (grid, log) = relocate_traced(grid, rng);
        world.grid = grid;
        world.log.relocations = log.len();
        Ok(())
    }
}
