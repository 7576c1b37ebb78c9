use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::rng::Draw;

/// Occupant of a grid cell. Codes follow the reference numbering
/// (0 vegetation … 5 human).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeciesId {
    Vegetation,
    Triceratops,
    Brachiosaurus,
    Velociraptor,
    TRex,
    Human,
}

impl SpeciesId {
    pub const ALL: [SpeciesId; 6] = [
        SpeciesId::Vegetation,
        SpeciesId::Triceratops,
        SpeciesId::Brachiosaurus,
        SpeciesId::Velociraptor,
        SpeciesId::TRex,
        SpeciesId::Human,
    ];

    pub fn from_code(code: u8) -> Result<Self> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or_else(|| SimError::UnknownSpecies(format!("code {code}")))
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_symbol(symbol: char) -> Result<Self> {
        match symbol {
            '.' => Ok(SpeciesId::Vegetation),
            'T' => Ok(SpeciesId::Triceratops),
            'B' => Ok(SpeciesId::Brachiosaurus),
            'V' => Ok(SpeciesId::Velociraptor),
            'R' => Ok(SpeciesId::TRex),
            'H' => Ok(SpeciesId::Human),
            other => Err(SimError::UnknownSpecies(format!("symbol '{other}'"))),
        }
    }

    pub fn symbol(self) -> char {
        match self {
            SpeciesId::Vegetation => '.',
            SpeciesId::Triceratops => 'T',
            SpeciesId::Brachiosaurus => 'B',
            SpeciesId::Velociraptor => 'V',
            SpeciesId::TRex => 'R',
            SpeciesId::Human => 'H',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SpeciesId::Vegetation => "vegetation",
            SpeciesId::Triceratops => "triceratops",
            SpeciesId::Brachiosaurus => "brachiosaurus",
            SpeciesId::Velociraptor => "velociraptor",
            SpeciesId::TRex => "t_rex",
            SpeciesId::Human => "human",
        }
    }

    pub fn is_vegetation(self) -> bool {
        self == SpeciesId::Vegetation
    }

    /// Velociraptor and TRex: obligate carnivores that breed at the kill site.
    pub fn is_predator(self) -> bool {
        matches!(self, SpeciesId::Velociraptor | SpeciesId::TRex)
    }

    /// The only species a Human can tame.
    pub fn is_tameable(self) -> bool {
        self.is_predator()
    }

    pub fn is_herbivore(self) -> bool {
        matches!(self, SpeciesId::Triceratops | SpeciesId::Brachiosaurus)
    }
}

/// Immutable per-species parameters. All fields except `health` lie in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpeciesStats {
    pub strength: f64,
    pub speed: f64,
    pub toughness: f64,
    pub coordination: f64,
    pub health: f64,
    pub reproduction_rate: f64,
    pub survivability: f64,
    pub harvest_rate: f64,
}

const CATALOG: &[(SpeciesId, SpeciesStats)] = &[
    (
        SpeciesId::Velociraptor,
        SpeciesStats {
            strength: 0.60,
            speed: 0.75,
            toughness: 0.35,
            coordination: 0.85,
            health: 55.0,
            reproduction_rate: 0.60,
            survivability: 0.975,
            harvest_rate: 0.0,
        },
    ),
    (
        SpeciesId::TRex,
        SpeciesStats {
            strength: 0.95,
            speed: 0.60,
            toughness: 0.70,
            coordination: 0.25,
            health: 90.0,
            reproduction_rate: 0.33,
            survivability: 0.975,
            harvest_rate: 0.0,
        },
    ),
    (
        SpeciesId::Triceratops,
        SpeciesStats {
            strength: 0.50,
            speed: 0.50,
            toughness: 0.50,
            coordination: 0.50,
            health: 60.0,
            reproduction_rate: 0.35,
            survivability: 0.71,
            harvest_rate: 0.40,
        },
    ),
    (
        SpeciesId::Brachiosaurus,
        SpeciesStats {
            strength: 0.80,
            speed: 0.20,
            toughness: 0.80,
            coordination: 0.20,
            health: 100.0,
            reproduction_rate: 0.25,
            survivability: 0.78,
            harvest_rate: 0.50,
        },
    ),
    (
        SpeciesId::Human,
        SpeciesStats {
            strength: 0.30,
            speed: 0.60,
            toughness: 0.55,
            coordination: 0.90,
            health: 30.0,
            reproduction_rate: 0.30,
            survivability: 0.825,
            harvest_rate: 0.15,
        },
    ),
];

/// Looks up the fixed statistics for a species. Vegetation has none.
pub fn stats_for(id: SpeciesId) -> Result<&'static SpeciesStats> {
    CATALOG
        .iter()
        .find(|(species, _)| *species == id)
        .map(|(_, stats)| stats)
        .ok_or_else(|| SimError::UnknownSpecies(id.name().to_string()))
}

/// Reproduction multiplier a predator earns from the species it just killed.
pub fn prey_multiplier(prey: SpeciesId) -> f64 {
    match prey {
        SpeciesId::Brachiosaurus => 1.5,
        SpeciesId::TRex => 1.3,
        SpeciesId::Triceratops => 1.1,
        SpeciesId::Velociraptor => 0.9,
        SpeciesId::Human => 0.7,
        SpeciesId::Vegetation => 1.0,
    }
}

pub fn coordination_bonus(attacker: &SpeciesStats, allies: usize, step: f64) -> f64 {
    1.0 + attacker.coordination * allies as f64 * step
}

/// Unclamped kill probability; values above 1 always succeed when drawn.
pub fn kill_chance(attacker: &SpeciesStats, target: &SpeciesStats, bonus: f64) -> f64 {
    attacker.strength * bonus * (1.0 - target.toughness) / target.health
}

pub fn survives<R: Rng + ?Sized>(stats: &SpeciesStats, rng: &mut R) -> bool {
    rng.chance(stats.survivability)
}

pub fn moves<R: Rng + ?Sized>(stats: &SpeciesStats, rng: &mut R) -> bool {
    rng.chance(stats.speed)
}

pub fn harvests<R: Rng + ?Sized>(stats: &SpeciesStats, rng: &mut R) -> bool {
    rng.chance(stats.harvest_rate)
}

pub fn reproduces<R: Rng + ?Sized>(stats: &SpeciesStats, multiplier: f64, rng: &mut R) -> bool {
    rng.chance(stats.reproduction_rate * multiplier)
}

pub fn kills<R: Rng + ?Sized>(
    attacker: &SpeciesStats,
    target: &SpeciesStats,
    bonus: f64,
    rng: &mut R,
) -> bool {
    rng.chance(kill_chance(attacker, target, bonus))
}
