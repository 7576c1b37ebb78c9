mod movement;
mod update;

pub use movement::{relocate, relocate_traced, MovementSystem, Relocation};
pub use update::{update, update_with_tally, UpdateSystem, UpdateTally};
