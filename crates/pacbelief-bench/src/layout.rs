use pacbelief_core::{Cell, GridError, GridMap};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const OBSERVER_MARKER: char = 'P';
const GHOST_MARKER: char = 'G';

/// A parsed world: the maze plus the starting cells of the observer and every ghost.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub grid: GridMap,
    pub observer_start: Cell,
    /// Ghost starts in reading order (top row first, left to right).
    pub ghost_starts: Vec<Cell>,
}

impl Layout {
    pub fn parse(text: &str) -> Result<Self, LayoutError> {
        let (grid, markers) = GridMap::from_ascii_with_markers(text)?;

        let mut observer_start = None;
        let mut ghost_starts = Vec::new();
        for (cell, marker) in markers {
            match marker {
                OBSERVER_MARKER => {
                    if let Some(first) = observer_start {
                        return Err(LayoutError::MultipleObservers { first, second: cell });
                    }
                    observer_start = Some(cell);
                }
                GHOST_MARKER => ghost_starts.push(cell),
                other => return Err(LayoutError::UnknownMarker { marker: other, cell }),
            }
        }

        let observer_start = observer_start.ok_or(LayoutError::MissingObserver)?;
        if ghost_starts.is_empty() {
            return Err(LayoutError::NoGhosts);
        }

        Ok(Self {
            grid,
            observer_start,
            ghost_starts,
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LayoutError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| LayoutError::Io {
            source,
            path: path.to_path_buf(),
        })?;
        Self::parse(&text)
    }

    pub fn ghost_count(&self) -> usize {
        self.ghost_starts.len()
    }
}

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("failed to read layout {path:?}: {source}")]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("no layout text or layout path configured")]
    MissingSource,
    #[error("layout has no observer start ('P')")]
    MissingObserver,
    #[error("layout has more than one observer start: {first} and {second}")]
    MultipleObservers { first: Cell, second: Cell },
    #[error("layout has no ghost starts ('G')")]
    NoGhosts,
    #[error("unknown layout marker {marker:?} at {cell}")]
    UnknownMarker { marker: char, cell: Cell },
}
