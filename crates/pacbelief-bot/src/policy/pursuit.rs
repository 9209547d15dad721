use super::{Policy, PolicyContext};
use crate::moves::{Direction, legal_moves};
use pacbelief_core::Cell;
use tracing::{Level, event};

/// Greedy hunter: step toward the nearest most-likely target position.
#[derive(Debug, Default, Clone, Copy)]
pub struct PursuitPolicy;

impl PursuitPolicy {
    pub fn new() -> Self {
        Self
    }

    pub fn choose(&self, ctx: &PolicyContext) -> Direction {
        let moves = legal_moves(ctx.grid, ctx.observer);
        let Some(&(fallback, _)) = moves.first() else {
            return Direction::Stop;
        };

        let targets = ctx.beliefs.most_likely_positions();
        if targets.is_empty() {
            log_choice(ctx, fallback, None, "no live targets");
            return fallback;
        }

        let mut best = fallback;
        let mut best_distance = usize::MAX;
        for (direction, next) in moves {
            let distance = nearest(next, &targets);
            if distance < best_distance {
                best = direction;
                best_distance = distance;
            }
        }

        log_choice(ctx, best, Some(best_distance), "pursue");
        best
    }
}

impl Policy for PursuitPolicy {
    fn choose_move(&mut self, ctx: &PolicyContext) -> Direction {
        self.choose(ctx)
    }
}

fn nearest(from: Cell, targets: &[Cell]) -> usize {
    targets
        .iter()
        .map(|target| from.manhattan(*target))
        .min()
        .unwrap_or(usize::MAX)
}

fn log_choice(ctx: &PolicyContext, chosen: Direction, distance: Option<usize>, reason: &str) {
    if !tracing::enabled!(Level::DEBUG) {
        return;
    }

    event!(
        target: "pacbelief_bot::pursuit",
        Level::DEBUG,
        turn = ctx.turn,
        observer = %ctx.observer,
        chosen = %chosen,
        distance = ?distance,
        reason,
    );
}
