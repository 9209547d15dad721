//! Observer-aware motion model for tracked targets.

use crate::belief::BeliefMap;
use crate::config::ConfigError;
use crate::grid::{Cell, GridMap};
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// How strongly a target prefers moves that keep its distance from the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorMode {
    Scared,
    Afraid,
    #[default]
    Confused,
}

impl BehaviorMode {
    pub const ALL: [BehaviorMode; 3] = [
        BehaviorMode::Scared,
        BehaviorMode::Afraid,
        BehaviorMode::Confused,
    ];

    /// Raw weight of a move that does not bring the target closer to the observer.
    /// Moves that do get weight 1.
    pub const fn avoidance_weight(self) -> f64 {
        match self {
            BehaviorMode::Scared => 8.0,
            BehaviorMode::Afraid => 2.0,
            BehaviorMode::Confused => 1.0,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            BehaviorMode::Scared => "scared",
            BehaviorMode::Afraid => "afraid",
            BehaviorMode::Confused => "confused",
        }
    }
}

impl FromStr for BehaviorMode {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        BehaviorMode::ALL
            .into_iter()
            .find(|mode| mode.name() == normalized)
            .ok_or_else(|| ConfigError::UnknownMode(raw.trim().to_string()))
    }
}

impl fmt::Display for BehaviorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `P(next cell | current cell)` for one observer position and mode.
///
/// Stored as one sparse row per grid cell; wall rows are empty. Every
/// traversable row sums to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionModel {
    observer: Cell,
    mode: BehaviorMode,
    width: usize,
    height: usize,
    rows: Vec<Vec<(Cell, f64)>>,
}

impl TransitionModel {
    pub fn build(grid: &GridMap, observer: Cell, mode: BehaviorMode) -> Self {
        let weight = mode.avoidance_weight();
        let mut rows = vec![Vec::new(); grid.cell_count()];

        for cell in grid.open_cells() {
            // A boxed-in cell comes back as its own only neighbour: a self-loop.
            let candidates = grid.legal_neighbors(cell);
            let distance = cell.manhattan(observer);
            let weighted: Vec<(Cell, f64)> = candidates
                .into_iter()
                .map(|next| {
                    let raw = if next.manhattan(observer) >= distance {
                        weight
                    } else {
                        1.0
                    };
                    (next, raw)
                })
                .collect();
            let total: f64 = weighted.iter().map(|(_, raw)| raw).sum();
            rows[grid.index(cell)] = weighted
                .into_iter()
                .map(|(next, raw)| (next, raw / total))
                .collect();
        }

        Self {
            observer,
            mode,
            width: grid.width(),
            height: grid.height(),
            rows,
        }
    }

    pub fn observer(&self) -> Cell {
        self.observer
    }

    pub fn mode(&self) -> BehaviorMode {
        self.mode
    }

    /// Successor distribution of `cell`; empty for walls and off-grid cells.
    pub fn row(&self, cell: Cell) -> &[(Cell, f64)] {
        if cell.x >= self.width || cell.y >= self.height {
            return &[];
        }
        &self.rows[cell.x * self.height + cell.y]
    }

    pub fn probability(&self, from: Cell, to: Cell) -> f64 {
        self.row(from)
            .iter()
            .filter(|(next, _)| *next == to)
            .map(|(_, prob)| *prob)
            .sum()
    }

    /// Prediction step: `predicted(c') = sum_c P(c' | c) * prior(c)`.
    pub fn predict(&self, prior: &BeliefMap) -> BeliefMap {
        let mut predicted = BeliefMap::zeros(self.width, self.height);
        for (cell, mass) in prior.iter() {
            if mass == 0.0 {
                continue;
            }
            for &(next, prob) in self.row(cell) {
                predicted.add(next, prob * mass);
            }
        }
        predicted
    }
}
