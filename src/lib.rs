pub mod config;
pub mod engine;
pub mod error;
pub mod grid;
pub mod registry;
pub mod rng;
pub mod scenario;
pub mod snapshot;
pub mod species;
pub mod systems;
pub mod world;

pub use engine::{Engine, EngineBuilder, EngineSettings, RoundSummary};
pub use error::SimError;
pub use grid::{Grid, Position};
pub use registry::TamedRegistry;
pub use scenario::Scenario;
pub use species::{SpeciesId, SpeciesStats};
pub use world::World;
