//! Fixed-size species occupancy grid and neighbourhood queries.

use std::ops::Deref;

use rand::Rng;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Result, SimError};
use crate::species::SpeciesId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor {
    pub pos: Position,
    pub occupant: SpeciesId,
}

/// Up to eight in-bounds neighbours, stored inline.
#[derive(Debug, Clone, Copy)]
pub struct Neighborhood {
    items: [Neighbor; 8],
    len: usize,
}

impl Neighborhood {
    fn empty() -> Self {
        Self {
            items: [Neighbor {
                pos: Position::new(0, 0),
                occupant: SpeciesId::Vegetation,
            }; 8],
            len: 0,
        }
    }

    fn push(&mut self, neighbor: Neighbor) {
        self.items[self.len] = neighbor;
        self.len += 1;
    }

    pub fn count_of(&self, id: SpeciesId) -> usize {
        self.iter().filter(|n| n.occupant == id).count()
    }
}

impl Deref for Neighborhood {
    type Target = [Neighbor];

    fn deref(&self) -> &[Neighbor] {
        &self.items[..self.len]
    }
}

/// Rectangular R×C grid; every cell holds exactly one species.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<SpeciesId>,
}

impl Grid {
    /// All-vegetation grid.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        Self::filled(rows, cols, SpeciesId::Vegetation)
    }

    /// Single vegetation cell; stands in while a system owns the real grid.
    pub(crate) fn placeholder() -> Self {
        Self {
            rows: 1,
            cols: 1,
            cells: vec![SpeciesId::Vegetation],
        }
    }

    pub fn filled(rows: usize, cols: usize, id: SpeciesId) -> Result<Self> {
        check_dimensions(rows, cols)?;
        Ok(Self {
            rows,
            cols,
            cells: vec![id; rows * cols],
        })
    }

    pub fn from_cells(rows: usize, cols: usize, cells: Vec<SpeciesId>) -> Result<Self> {
        check_dimensions(rows, cols)?;
        if cells.len() != rows * cols {
            return Err(SimError::InvalidGridDimensions { rows, cols });
        }
        Ok(Self { rows, cols, cells })
    }

    pub fn from_codes(rows: usize, cols: usize, codes: &[u8]) -> Result<Self> {
        let cells = codes
            .iter()
            .map(|code| SpeciesId::from_code(*code))
            .collect::<Result<Vec<_>>>()?;
        Self::from_cells(rows, cols, cells)
    }

    /// Parses rows of species symbols (`.TBVRH`). Whitespace is ignored.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        let mut cells = Vec::new();
        let mut cols = 0;
        for (index, line) in rows.iter().enumerate() {
            let parsed = line
                .as_ref()
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(SpeciesId::from_symbol)
                .collect::<Result<Vec<_>>>()?;
            if index == 0 {
                cols = parsed.len();
            } else if parsed.len() != cols {
                return Err(SimError::InvalidGridDimensions {
                    rows: rows.len(),
                    cols: parsed.len(),
                });
            }
            cells.extend(parsed);
        }
        Self::from_cells(rows.len(), cols, cells)
    }

    /// Every cell drawn uniformly from the six species codes.
    pub fn random_uniform<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Result<Self> {
        check_dimensions(rows, cols)?;
        let cells = (0..rows * cols)
            .map(|_| SpeciesId::ALL[rng.gen_range(0..SpeciesId::ALL.len())])
            .collect();
        Ok(Self { rows, cols, cells })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, pos: Position) -> SpeciesId {
        self.cells[self.index(pos)]
    }

    pub fn set(&mut self, pos: Position, id: SpeciesId) {
        let index = self.index(pos);
        self.cells[index] = id;
    }

    pub fn index(&self, pos: Position) -> usize {
        debug_assert!(pos.row < self.rows && pos.col < self.cols);
        pos.row * self.cols + pos.col
    }

    pub fn position(&self, index: usize) -> Position {
        Position::new(index / self.cols, index % self.cols)
    }

    /// Row-major iterator over all positions.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.cells.len()).map(move |i| self.position(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, SpeciesId)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, id)| (self.position(i), *id))
    }

    /// Positions holding anything but vegetation, row-major.
    pub fn occupied(&self) -> Vec<Position> {
        self.iter()
            .filter(|(_, id)| !id.is_vegetation())
            .map(|(pos, _)| pos)
            .collect()
    }

    /// The 8-neighbourhood of `pos`, clipped at the borders (no wraparound).
    pub fn neighbors(&self, pos: Position) -> Neighborhood {
        let mut out = Neighborhood::empty();
        for dr in -1i64..=1 {
            for dc in -1i64..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let row = pos.row as i64 + dr;
                let col = pos.col as i64 + dc;
                if row < 0 || col < 0 || row >= self.rows as i64 || col >= self.cols as i64 {
                    continue;
                }
                let npos = Position::new(row as usize, col as usize);
                out.push(Neighbor {
                    pos: npos,
                    occupant: self.get(npos),
                });
            }
        }
        out
    }

    pub fn count_same_species(&self, pos: Position, id: SpeciesId) -> usize {
        self.neighbors(pos).count_of(id)
    }

    pub fn counts(&self) -> PopulationCounts {
        let mut counts = PopulationCounts::default();
        for id in &self.cells {
            counts.add(*id);
        }
        counts
    }

    /// One string of species symbols per row.
    pub fn to_rows(&self) -> Vec<String> {
        self.cells
            .chunks(self.cols.max(1))
            .map(|row| row.iter().map(|id| id.symbol()).collect())
            .collect()
    }
}

fn check_dimensions(rows: usize, cols: usize) -> Result<()> {
    if rows == 0 || cols == 0 {
        return Err(SimError::InvalidGridDimensions { rows, cols });
    }
    Ok(())
}

/// Occupied-cell count per species.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulationCounts {
    counts: [usize; 6],
}

impl PopulationCounts {
    pub fn add(&mut self, id: SpeciesId) {
        self.counts[id.code() as usize] += 1;
    }

    pub fn get(&self, id: SpeciesId) -> usize {
        self.counts[id.code() as usize]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Everything that is not vegetation.
    pub fn creatures(&self) -> usize {
        self.total() - self.get(SpeciesId::Vegetation)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SpeciesId, usize)> + '_ {
        SpeciesId::ALL.iter().map(move |id| (*id, self.get(*id)))
    }
}

impl Serialize for PopulationCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.counts.len()))?;
        for (id, count) in self.iter() {
            map.serialize_entry(id.name(), &count)?;
        }
        map.end()
    }
}
