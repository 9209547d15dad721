//! Noisy-distance sensor likelihoods.
//!
//! The sensor reports the Manhattan distance to a target plus a recentred
//! Binomial(n, 0.5) error term, where `n` is chosen so that the error variance
//! `n * p * (1 - p)` approximates the configured sensor variance.

use crate::belief::BeliefMap;
use crate::config::{ConfigError, check_variance};
use crate::grid::{Cell, GridMap};
use statrs::distribution::{Binomial, Discrete};

/// Success probability of each Bernoulli trial in the noise process.
pub const NOISE_PROBABILITY: f64 = 0.5;

/// Distance from an integer below which a PMF argument is treated as integral.
const INTEGER_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct SensorModel {
    variance: f64,
    trials: u64,
    binomial: Binomial,
}

impl SensorModel {
    pub fn from_variance(variance: f64) -> Result<Self, ConfigError> {
        check_variance(variance)?;
        let p = NOISE_PROBABILITY;
        let trials = (variance / (p * (1.0 - p))).floor() as u64;
        let binomial = Binomial::new(p, trials)
            .map_err(|err| ConfigError::Distribution(err.to_string()))?;
        Ok(Self {
            variance,
            trials,
            binomial,
        })
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    /// Number of Bernoulli trials `n`.
    pub fn trials(&self) -> u64 {
        self.trials
    }

    pub fn probability(&self) -> f64 {
        NOISE_PROBABILITY
    }

    /// Mean of the raw binomial draw, `n * p`.
    pub fn offset(&self) -> f64 {
        self.trials as f64 * NOISE_PROBABILITY
    }

    pub(crate) fn binomial(&self) -> &Binomial {
        &self.binomial
    }

    /// Binomial PMF at `k`; zero for non-integral or out-of-range arguments.
    pub fn pmf(&self, k: f64) -> f64 {
        if !k.is_finite() {
            return 0.0;
        }
        let rounded = k.round();
        if (k - rounded).abs() > INTEGER_TOLERANCE || rounded < 0.0 {
            return 0.0;
        }
        if rounded > self.trials as f64 {
            return 0.0;
        }
        self.binomial.pmf(rounded as u64)
    }

    /// `P(evidence | target at c)` for every traversable cell `c`; walls stay 0.
    pub fn likelihood(&self, grid: &GridMap, observer: Cell, evidence: f64) -> BeliefMap {
        let mut map = BeliefMap::zeros_like(grid);
        let offset = self.offset();
        for cell in grid.open_cells() {
            let distance = cell.manhattan(observer) as f64;
            map.set(cell, self.pmf(evidence - distance + offset));
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trials_follow_variance() {
        assert_eq!(SensorModel::from_variance(1.0).expect("sensor").trials(), 4);
        assert_eq!(SensorModel::from_variance(2.9).expect("sensor").trials(), 11);
        assert_eq!(SensorModel::from_variance(0.1).expect("sensor").trials(), 0);
    }

    #[test]
    fn rejects_invalid_variance() {
        assert_eq!(
            SensorModel::from_variance(0.0).unwrap_err(),
            ConfigError::InvalidVariance(0.0)
        );
        assert!(SensorModel::from_variance(-3.0).is_err());
        assert_eq!(
            SensorModel::from_variance(4e8).unwrap_err(),
            ConfigError::VarianceTooLarge(4e8)
        );
    }

    #[test]
    fn pmf_is_zero_off_the_integer_lattice() {
        let sensor = SensorModel::from_variance(1.0).expect("sensor");
        assert_eq!(sensor.pmf(1.5), 0.0);
        assert_eq!(sensor.pmf(-1.0), 0.0);
        assert_eq!(sensor.pmf(5.0), 0.0);
        assert!((sensor.pmf(2.0) - 6.0 / 16.0).abs() < 1e-12);
        assert!((sensor.pmf(0.0) - 1.0 / 16.0).abs() < 1e-12);
    }

    #[test]
    fn likelihood_peaks_where_distance_matches_evidence() {
        let grid = GridMap::open(6, 1).expect("grid");
        let sensor = SensorModel::from_variance(1.0).expect("sensor");
        let observer = Cell::new(0, 0);
        let map = sensor.likelihood(&grid, observer, 3.0);
        let peak = map.get(Cell::new(3, 0));
        for (cell, value) in map.iter() {
            assert!(value >= 0.0);
            if cell != Cell::new(3, 0) {
                assert!(value < peak, "{cell} should be below the peak");
            }
        }
        assert_eq!(map.get(Cell::new(0, 0)), sensor.pmf(5.0));
    }

    #[test]
    fn likelihood_is_zero_on_walls() {
        let grid = GridMap::from_ascii(".%.\n").expect("layout");
        let sensor = SensorModel::from_variance(1.0).expect("sensor");
        let map = sensor.likelihood(&grid, Cell::new(0, 0), 1.0);
        assert_eq!(map.get(Cell::new(1, 0)), 0.0);
        assert!(map.get(Cell::new(2, 0)) > 0.0);
    }
}
