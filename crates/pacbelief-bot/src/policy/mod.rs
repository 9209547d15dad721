mod pursuit;

pub use pursuit::PursuitPolicy;

use crate::moves::Direction;
use pacbelief_core::{BeliefView, Cell, GridMap};

/// Context provided to policies for choosing the observer's next move.
pub struct PolicyContext<'a> {
    pub grid: &'a GridMap,
    pub observer: Cell,
    pub beliefs: &'a dyn BeliefView,
    pub turn: u64,
}

/// Downstream consumer of belief matrices.
pub trait Policy: Send {
    fn choose_move(&mut self, ctx: &PolicyContext) -> Direction;
}
