use std::collections::HashMap;

use serde::Serialize;

use crate::grid::Position;

/// Positions of tamed predators and the rounds their taming has left.
///
/// Entries are keyed by position, not by occupant: when the tamed creature
/// dies or is replaced, the entry stays until it expires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TamedRegistry {
    entries: HashMap<Position, u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TamedEntry {
    pub pos: Position,
    pub remaining: u32,
}

impl TamedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a taming at `pos`, replacing any earlier entry.
    pub fn tame(&mut self, pos: Position, rounds: u32) {
        if rounds > 0 {
            self.entries.insert(pos, rounds);
        }
    }

    pub fn is_tamed(&self, pos: Position) -> bool {
        self.entries.contains_key(&pos)
    }

    pub fn remaining(&self, pos: Position) -> Option<u32> {
        self.entries.get(&pos).copied()
    }

    /// Decrements every entry once and drops those that reach zero.
    pub fn age(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, remaining| {
            *remaining = remaining.saturating_sub(1);
            *remaining > 0
        });
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by position.
    pub fn entries(&self) -> Vec<TamedEntry> {
        let mut entries: Vec<TamedEntry> = self
            .entries
            .iter()
            .map(|(pos, remaining)| TamedEntry {
                pos: *pos,
                remaining: *remaining,
            })
            .collect();
        entries.sort_by_key(|entry| entry.pos);
        entries
    }
}
