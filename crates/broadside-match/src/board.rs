//! Reconciled board views.
//!
//! A [`BoardView`] is what the client believes one board looks like. It is
//! rebuilt from scratch from every `STATE` snapshot (snapshots are full
//! replacements, never deltas), or from the local layout before the first
//! snapshot about the own board arrives.

use std::collections::BTreeSet;

use broadside_protocol::{BoardReport, Coordinate};

/// One ship as far as this client can see it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObservedShip {
    /// Known cells, in order. For an opponent ship this is only what the
    /// server revealed: the hit cells, or the full extent once sunk.
    pub cells: Vec<Coordinate>,
    pub hits: BTreeSet<Coordinate>,
    pub sunk: bool,
}

/// What a single cell shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellState {
    /// Nothing known.
    Water,
    /// An unhit ship cell (own board only).
    Ship,
    /// Fired upon, nothing there.
    Miss,
    Hit,
    /// Part of a sunk ship.
    Sunk,
}

/// One board: ships plus every cell fired upon.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoardView {
    pub ships: Vec<ObservedShip>,
    pub shots: BTreeSet<Coordinate>,
}

impl BoardView {
    /// Builds a view from a server snapshot.
    pub fn from_report(report: &BoardReport) -> Self {
        let ships = report
            .ships
            .iter()
            .map(|ship| {
                let hits: BTreeSet<Coordinate> = ship.heated_cords.iter().copied().collect();
                let mut cells = ship.cells();
                if cells.is_empty() {
                    cells = hits.iter().copied().collect();
                }
                ObservedShip {
                    cells,
                    hits,
                    sunk: ship.is_killed,
                }
            })
            .collect();

        Self {
            ships,
            shots: report.shooted_cords.iter().copied().collect(),
        }
    }

    /// Builds an untouched own board from the committed layout.
    pub fn from_layout(layout: &[Vec<Coordinate>]) -> Self {
        Self {
            ships: layout
                .iter()
                .map(|cells| ObservedShip {
                    cells: cells.clone(),
                    ..ObservedShip::default()
                })
                .collect(),
            shots: BTreeSet::new(),
        }
    }

    pub fn has_shot(&self, at: Coordinate) -> bool {
        self.shots.contains(&at)
    }

    /// Number of sunk ships.
    pub fn sunk_count(&self) -> usize {
        self.ships.iter().filter(|s| s.sunk).count()
    }

    /// What to draw at `at`.
    pub fn cell(&self, at: Coordinate) -> CellState {
        let ship = self.ships.iter().find(|s| s.cells.contains(&at) || s.hits.contains(&at));
        match ship {
            Some(s) if s.sunk => CellState::Sunk,
            Some(s) if s.hits.contains(&at) => CellState::Hit,
            Some(_) if self.has_shot(at) => CellState::Hit,
            Some(_) => CellState::Ship,
            None if self.has_shot(at) => CellState::Miss,
            None => CellState::Water,
        }
    }
}
