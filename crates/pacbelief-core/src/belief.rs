//! Per-target probability matrices over grid positions.

use crate::grid::{Cell, GridError, GridMap};
use serde::{Deserialize, Serialize};

/// Non-negative `width x height` matrix, serialized as `[x][y]` columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct BeliefMap {
    width: usize,
    height: usize,
    probs: Vec<f64>,
}

impl BeliefMap {
    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            probs: vec![0.0; width * height],
        }
    }

    pub fn zeros_like(grid: &GridMap) -> Self {
        Self::zeros(grid.width(), grid.height())
    }

    /// Equal mass on every traversable cell, zero on walls.
    pub fn uniform(grid: &GridMap) -> Self {
        let mut map = Self::zeros_like(grid);
        let share = 1.0 / grid.open_count() as f64;
        for cell in grid.open_cells() {
            map.set(cell, share);
        }
        map
    }

    /// All mass on `cell`. An off-grid or wall cell yields the all-zero map.
    pub fn point(grid: &GridMap, cell: Cell) -> Self {
        let mut map = Self::zeros_like(grid);
        if grid.is_open(cell) {
            map.set(cell, 1.0);
        }
        map
    }

    /// Builds a map from `[x][y]` columns.
    pub fn from_columns(columns: Vec<Vec<f64>>) -> Result<Self, GridError> {
        let width = columns.len();
        let height = columns.first().map(Vec::len).unwrap_or(0);
        if width == 0 || height == 0 {
            return Err(GridError::EmptyDimensions { width, height });
        }
        let mut probs = Vec::with_capacity(width * height);
        for (row, column) in columns.into_iter().enumerate() {
            if column.len() != height {
                return Err(GridError::RaggedRow {
                    row,
                    expected: height,
                    found: column.len(),
                });
            }
            probs.extend(column);
        }
        Ok(Self {
            width,
            height,
            probs,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn matches(&self, grid: &GridMap) -> bool {
        self.width == grid.width() && self.height == grid.height()
    }

    /// Probability at `cell`; zero outside the matrix.
    pub fn get(&self, cell: Cell) -> f64 {
        self.index(cell).map(|index| self.probs[index]).unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.probs.iter().sum()
    }

    pub fn is_zero(&self) -> bool {
        self.probs.iter().all(|prob| *prob == 0.0)
    }

    /// Cell holding the largest probability, first in storage order on ties.
    pub fn argmax(&self) -> Option<Cell> {
        let mut best: Option<(usize, f64)> = None;
        for (index, prob) in self.probs.iter().copied().enumerate() {
            if prob <= 0.0 {
                continue;
            }
            if best.is_none_or(|(_, top)| prob > top) {
                best = Some((index, prob));
            }
        }
        best.map(|(index, _)| self.cell_at(index))
    }

    /// Shannon entropy in nats.
    pub fn entropy(&self) -> f64 {
        self.probs
            .iter()
            .filter(|prob| **prob > 0.0)
            .map(|prob| -prob * prob.ln())
            .sum()
    }

    /// Iterates `(cell, probability)` pairs in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (Cell, f64)> + '_ {
        self.probs
            .iter()
            .copied()
            .enumerate()
            .map(|(index, prob)| (self.cell_at(index), prob))
    }

    pub(crate) fn set(&mut self, cell: Cell, value: f64) {
        if let Some(index) = self.index(cell) {
            self.probs[index] = value;
        }
    }

    pub(crate) fn add(&mut self, cell: Cell, value: f64) {
        if let Some(index) = self.index(cell) {
            self.probs[index] += value;
        }
    }

    pub(crate) fn clear(&mut self) {
        self.probs.iter_mut().for_each(|prob| *prob = 0.0);
    }

    /// Element-wise product with a same-shaped likelihood matrix.
    pub(crate) fn weight_by(&mut self, likelihood: &BeliefMap) {
        for (prob, weight) in self.probs.iter_mut().zip(likelihood.probs.iter()) {
            *prob *= *weight;
        }
    }

    pub(crate) fn divide_by(&mut self, total: f64) {
        self.probs.iter_mut().for_each(|prob| *prob /= total);
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        (cell.x < self.width && cell.y < self.height).then(|| cell.x * self.height + cell.y)
    }

    fn cell_at(&self, index: usize) -> Cell {
        Cell::new(index / self.height, index % self.height)
    }
}

impl TryFrom<Vec<Vec<f64>>> for BeliefMap {
    type Error = GridError;

    fn try_from(columns: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Self::from_columns(columns)
    }
}

impl From<BeliefMap> for Vec<Vec<f64>> {
    fn from(map: BeliefMap) -> Self {
        map.probs
            .chunks(map.height.max(1))
            .map(<[f64]>::to_vec)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pocket() -> GridMap {
        GridMap::from_ascii("%..\n...\n").expect("layout")
    }

    #[test]
    fn uniform_sums_to_one_and_skips_walls() {
        let grid = pocket();
        let map = BeliefMap::uniform(&grid);
        assert!((map.total() - 1.0).abs() < 1e-12);
        assert_eq!(map.get(Cell::new(0, 1)), 0.0);
        assert!((map.get(Cell::new(1, 1)) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn point_on_wall_is_all_zero() {
        let grid = pocket();
        assert!(BeliefMap::point(&grid, Cell::new(0, 1)).is_zero());
        assert_eq!(BeliefMap::point(&grid, Cell::new(2, 0)).argmax(), Some(Cell::new(2, 0)));
    }

    #[test]
    fn argmax_prefers_first_cell_on_ties() {
        let map = BeliefMap::from_columns(vec![vec![0.0, 0.5], vec![0.5, 0.0]]).expect("map");
        assert_eq!(map.argmax(), Some(Cell::new(0, 1)));
        assert_eq!(BeliefMap::zeros(2, 2).argmax(), None);
    }

    #[test]
    fn entropy_of_point_mass_is_zero() {
        let grid = pocket();
        assert_eq!(BeliefMap::point(&grid, Cell::new(1, 0)).entropy(), 0.0);
        let uniform = BeliefMap::uniform(&grid).entropy();
        assert!((uniform - 5f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn json_uses_column_layout() {
        let map = BeliefMap::from_columns(vec![vec![0.25, 0.0], vec![0.75, 0.0]]).expect("map");
        let json = serde_json::to_string(&map).expect("serialize");
        assert_eq!(json, "[[0.25,0.0],[0.75,0.0]]");
        let decoded: BeliefMap = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded, map);
        assert!(serde_json::from_str::<BeliefMap>("[[0.5],[0.25,0.25]]").is_err());
    }
}
