use pacbelief_core::{BehaviorMode, Cell, TransitionModel};
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

/// Ground-truth state of one simulated ghost.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Ghost {
    pub(crate) mode: BehaviorMode,
    /// `None` once the observer has caught the ghost.
    pub(crate) position: Option<Cell>,
    pub(crate) caught_turn: Option<u64>,
}

impl Ghost {
    pub(crate) fn new(start: Cell, mode: BehaviorMode) -> Self {
        Self {
            mode,
            position: Some(start),
            caught_turn: None,
        }
    }

    pub(crate) fn is_caught(&self) -> bool {
        self.position.is_none()
    }

    /// Removes the ghost from play if it shares a cell with the observer.
    pub(crate) fn check_capture(&mut self, observer: Cell, turn: u64) -> bool {
        if self.position == Some(observer) {
            self.position = None;
            self.caught_turn = Some(turn);
            return true;
        }
        false
    }
}

/// Samples the ghost's next cell from the model row of its current cell.
///
/// A row the sampler cannot use leaves the ghost where it is.
pub(crate) fn step_ghost<R: Rng + ?Sized>(
    model: &TransitionModel,
    from: Cell,
    rng: &mut R,
) -> Cell {
    let row = model.row(from);
    match WeightedIndex::new(row.iter().map(|(_, prob)| *prob)) {
        Ok(dist) => row[dist.sample(rng)].0,
        Err(_) => from,
    }
}
