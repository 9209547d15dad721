use core::fmt;
use pacbelief_core::{Cell, GridMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
    Stop,
}

impl Direction {
    /// Moving directions in the order candidates are considered.
    pub const MOVES: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    pub const fn delta(self) -> (isize, isize) {
        match self {
            Direction::North => (0, 1),
            Direction::South => (0, -1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::Stop => (0, 0),
        }
    }

    /// Destination of this move, or `None` when it would leave the non-negative quadrant.
    pub fn apply(self, cell: Cell) -> Option<Cell> {
        let (dx, dy) = self.delta();
        let x = cell.x.checked_add_signed(dx)?;
        let y = cell.y.checked_add_signed(dy)?;
        Some(Cell::new(x, y))
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Direction::North => "North",
            Direction::South => "South",
            Direction::East => "East",
            Direction::West => "West",
            Direction::Stop => "Stop",
        };
        f.write_str(label)
    }
}

/// Moves from `from` that land on a traversable cell. `Stop` is never included.
pub fn legal_moves(grid: &GridMap, from: Cell) -> Vec<(Direction, Cell)> {
    Direction::MOVES
        .into_iter()
        .filter_map(|direction| direction.apply(from).map(|to| (direction, to)))
        .filter(|(_, to)| grid.is_open(*to))
        .collect()
}
