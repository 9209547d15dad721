//! Static wall layout and four-connected neighborhood queries.

use core::fmt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Characters in an ASCII layout that never mark anything but open floor.
const FLOOR_CHARS: [char; 3] = [' ', '.', 'o'];
const WALL_CHAR: char = '%';

/// A grid coordinate. `x` grows to the east, `y` grows to the north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

impl Cell {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    pub const fn manhattan(self, other: Cell) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl From<(usize, usize)> for Cell {
    fn from((x, y): (usize, usize)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("grid dimensions must be non-zero (got {width}x{height})")]
    EmptyDimensions { width: usize, height: usize },
    #[error("wall layout has {found} cells, expected {expected}")]
    WallCount { expected: usize, found: usize },
    #[error("grid has no traversable cell")]
    NoOpenCell,
    #[error("layout row {row} has width {found}, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Immutable `width x height` wall matrix.
///
/// Cells are stored column-major (`x * height + y`), the same order used by
/// [`crate::BeliefMap`], so a grid index doubles as a belief index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridMap {
    width: usize,
    height: usize,
    walls: Vec<bool>,
    open_count: usize,
}

impl GridMap {
    /// Builds a grid from a column-major wall vector (`true` = wall).
    pub fn new(width: usize, height: usize, walls: Vec<bool>) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::EmptyDimensions { width, height });
        }
        let expected = width * height;
        if walls.len() != expected {
            return Err(GridError::WallCount {
                expected,
                found: walls.len(),
            });
        }
        let open_count = walls.iter().filter(|wall| !**wall).count();
        if open_count == 0 {
            return Err(GridError::NoOpenCell);
        }
        Ok(Self {
            width,
            height,
            walls,
            open_count,
        })
    }

    /// A grid without any wall.
    pub fn open(width: usize, height: usize) -> Result<Self, GridError> {
        Self::new(width, height, vec![false; width * height])
    }

    /// Parses a layout where `%` marks a wall. The first text row is the top of the grid.
    pub fn from_ascii(text: &str) -> Result<Self, GridError> {
        Self::from_ascii_with_markers(text).map(|(grid, _)| grid)
    }

    /// Parses a layout and also returns every non-floor, non-wall character with its cell.
    ///
    /// Markers are reported in reading order (top row first, left to right).
    pub fn from_ascii_with_markers(text: &str) -> Result<(Self, Vec<(Cell, char)>), GridError> {
        let rows: Vec<Vec<char>> = text
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.chars().collect())
            .collect();

        let height = rows.len();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if width == 0 || height == 0 {
            return Err(GridError::EmptyDimensions { width, height });
        }

        let mut walls = vec![false; width * height];
        let mut markers = Vec::new();
        for (row_index, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(GridError::RaggedRow {
                    row: row_index,
                    expected: width,
                    found: row.len(),
                });
            }
            let y = height - 1 - row_index;
            for (x, ch) in row.iter().copied().enumerate() {
                if ch == WALL_CHAR {
                    walls[x * height + y] = true;
                } else if !FLOOR_CHARS.contains(&ch) {
                    markers.push((Cell::new(x, y), ch));
                }
            }
        }

        Ok((Self::new(width, height, walls)?, markers))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// Number of traversable cells.
    pub fn open_count(&self) -> usize {
        self.open_count
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.x < self.width && cell.y < self.height
    }

    /// Out-of-bounds coordinates are reported as walls.
    pub fn is_wall(&self, x: usize, y: usize) -> bool {
        let cell = Cell::new(x, y);
        !self.contains(cell) || self.walls[self.index(cell)]
    }

    pub fn is_open(&self, cell: Cell) -> bool {
        !self.is_wall(cell.x, cell.y)
    }

    /// Iterates traversable cells in storage order.
    pub fn open_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.cell_count())
            .filter(|&index| !self.walls[index])
            .map(|index| self.cell_at(index))
    }

    /// Four-connected traversable neighbours in N, S, E, W order.
    ///
    /// A cell boxed in on every side yields itself, so the result is never empty.
    pub fn legal_neighbors(&self, cell: Cell) -> Vec<Cell> {
        let mut neighbors = Vec::with_capacity(4);
        let candidates = [
            Some(Cell::new(cell.x, cell.y + 1)),
            cell.y.checked_sub(1).map(|y| Cell::new(cell.x, y)),
            Some(Cell::new(cell.x + 1, cell.y)),
            cell.x.checked_sub(1).map(|x| Cell::new(x, cell.y)),
        ];
        for next in candidates.into_iter().flatten() {
            if self.is_open(next) {
                neighbors.push(next);
            }
        }
        if neighbors.is_empty() {
            neighbors.push(cell);
        }
        neighbors
    }

    pub(crate) fn index(&self, cell: Cell) -> usize {
        cell.x * self.height + cell.y
    }

    pub(crate) fn cell_at(&self, index: usize) -> Cell {
        Cell::new(index / self.height, index % self.height)
    }
}
