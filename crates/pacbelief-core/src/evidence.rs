//! Noisy distance readings for the simulation driver.

use crate::config::ConfigError;
use crate::grid::Cell;
use crate::sensor::SensorModel;
use rand::Rng;
use rand::distributions::Distribution;

/// Draws sensor readings with the same noise process the filter's likelihood assumes.
#[derive(Debug, Clone)]
pub struct EvidenceGenerator {
    sensor: SensorModel,
}

impl EvidenceGenerator {
    pub fn new(sensor: SensorModel) -> Self {
        Self { sensor }
    }

    pub fn from_variance(variance: f64) -> Result<Self, ConfigError> {
        SensorModel::from_variance(variance).map(Self::new)
    }

    pub fn sensor(&self) -> &SensorModel {
        &self.sensor
    }

    /// Zero-mean noise term: a Binomial(n, p) draw minus `n * p`.
    ///
    /// statrs samples one Bernoulli trial per unit of `n`, so a draw is linear in
    /// the variance; [`crate::config::MAX_SENSOR_VARIANCE`] keeps it bounded.
    pub fn noise<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let draw: f64 = self.sensor.binomial().sample(rng);
        draw - self.sensor.offset()
    }

    pub fn sample<R: Rng + ?Sized>(&self, target: Cell, observer: Cell, rng: &mut R) -> f64 {
        target.manhattan(observer) as f64 + self.noise(rng)
    }

    /// One reading per target, in target order.
    pub fn sample_all<R: Rng + ?Sized>(
        &self,
        targets: &[Cell],
        observer: Cell,
        rng: &mut R,
    ) -> Vec<f64> {
        targets
            .iter()
            .map(|target| self.sample(*target, observer, rng))
            .collect()
    }
}
