use crate::belief::BeliefMap;
use crate::grid::Cell;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeliefMetrics {
    pub entropy: f64,
    pub max_probability: f64,
    pub most_likely: Option<Cell>,
    pub total_mass: f64,
}

impl BeliefMetrics {
    pub fn from_belief(belief: &BeliefMap) -> Self {
        let most_likely = belief.argmax();
        Self {
            entropy: belief.entropy(),
            max_probability: most_likely.map(|cell| belief.get(cell)).unwrap_or(0.0),
            most_likely,
            total_mass: belief.total(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_mass == 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnMetrics {
    pub turn: u64,
    pub targets: Vec<BeliefMetrics>,
}

impl TurnMetrics {
    pub fn from_beliefs(turn: u64, beliefs: &[BeliefMap]) -> Self {
        Self {
            turn,
            targets: beliefs.iter().map(BeliefMetrics::from_belief).collect(),
        }
    }

    /// Mean entropy over targets that still carry mass.
    pub fn mean_entropy(&self) -> Option<f64> {
        let live: Vec<f64> = self
            .targets
            .iter()
            .filter(|metrics| !metrics.is_empty())
            .map(|metrics| metrics.entropy)
            .collect();
        if live.is_empty() {
            None
        } else {
            Some(live.iter().sum::<f64>() / live.len() as f64)
        }
    }
}
