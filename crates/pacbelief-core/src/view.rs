//! Read-only access to belief matrices for downstream action selection.

use crate::belief::BeliefMap;
use crate::filter::BeliefFilter;
use crate::grid::Cell;

pub trait BeliefView {
    fn target_count(&self) -> usize;

    fn belief(&self, target: usize) -> Option<&BeliefMap>;

    fn is_eliminated(&self, target: usize) -> bool {
        self.belief(target).is_none_or(BeliefMap::is_zero)
    }

    fn most_likely(&self, target: usize) -> Option<Cell> {
        if self.is_eliminated(target) {
            return None;
        }
        self.belief(target).and_then(BeliefMap::argmax)
    }

    /// Most likely cell of every live target, in target order.
    fn most_likely_positions(&self) -> Vec<Cell> {
        (0..self.target_count())
            .filter_map(|target| self.most_likely(target))
            .collect()
    }
}

impl BeliefView for BeliefFilter {
    fn target_count(&self) -> usize {
        BeliefFilter::target_count(self)
    }

    fn belief(&self, target: usize) -> Option<&BeliefMap> {
        BeliefFilter::belief(self, target)
    }

    fn is_eliminated(&self, target: usize) -> bool {
        BeliefFilter::is_eliminated(self, target)
    }
}

impl BeliefView for [BeliefMap] {
    fn target_count(&self) -> usize {
        self.len()
    }

    fn belief(&self, target: usize) -> Option<&BeliefMap> {
        self.get(target)
    }
}

impl BeliefView for Vec<BeliefMap> {
    fn target_count(&self) -> usize {
        self.len()
    }

    fn belief(&self, target: usize) -> Option<&BeliefMap> {
        self.get(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridMap;

    #[test]
    fn slice_view_skips_empty_beliefs() {
        let grid = GridMap::open(3, 1).expect("grid");
        let beliefs = vec![
            BeliefMap::zeros_like(&grid),
            BeliefMap::point(&grid, Cell::new(2, 0)),
        ];
        let view: &[BeliefMap] = &beliefs;
        assert!(view.is_eliminated(0));
        assert!(view.is_eliminated(5));
        assert_eq!(view.most_likely(1), Some(Cell::new(2, 0)));
        assert_eq!(view.most_likely_positions(), vec![Cell::new(2, 0)]);
    }
}
