//! Discrete Bayes filter over per-target position beliefs.
//!
//! Each call to [`BeliefFilter::update`] runs one turn of the filter for every
//! tracked target:
//! - predict: push the prior through the observer-aware transition model;
//! - weight: multiply by the sensor likelihood of that target's evidence;
//! - normalize: rescale to unit mass, or fall back to a uniform belief when
//!   no probability mass survives.

use crate::belief::BeliefMap;
use crate::cache::TransitionCache;
use crate::config::{ConfigError, TrackerConfig};
use crate::grid::{Cell, GridMap};
use crate::sensor::SensorModel;
use crate::transition::{BehaviorMode, TransitionModel};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{Level, event};

/// Caller contract violations. Degenerate evidence is never an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("expected {expected} priors (one per configured mode), got {found}")]
    PriorCount { expected: usize, found: usize },
    #[error("prior {target} is {found_width}x{found_height}, grid is {width}x{height}")]
    PriorShape {
        target: usize,
        width: usize,
        height: usize,
        found_width: usize,
        found_height: usize,
    },
    #[error("prior {target} has a negative or non-finite entry at {cell}")]
    InvalidPrior { target: usize, cell: Cell },
    #[error("expected {expected} {input} values, got {found}")]
    InputLength {
        input: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("observer position {0} is off the grid or inside a wall")]
    ObserverPosition(Cell),
}

/// What happened to one target during an update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetOutcome {
    /// Normal Bayes update; `evidence_mass` is the pre-normalization total.
    Updated { evidence_mass: f64 },
    /// The target is eliminated and its belief is all-zero.
    Eliminated,
    /// No mass survived weighting; the belief was reset to uniform.
    Reset,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateReport {
    pub turn: u64,
    pub observer: Cell,
    pub outcomes: Vec<TargetOutcome>,
}

impl UpdateReport {
    pub fn reset_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, TargetOutcome::Reset))
            .count()
    }
}

/// Owns one belief per tracked target for the lifetime of a tracking session.
#[derive(Debug)]
pub struct BeliefFilter {
    grid: GridMap,
    sensor: SensorModel,
    modes: Vec<BehaviorMode>,
    beliefs: Vec<BeliefMap>,
    eliminated: Vec<bool>,
    cache: TransitionCache,
    turn: u64,
    last_report: Option<UpdateReport>,
}

impl BeliefFilter {
    /// Starts a session from one prior per configured mode.
    ///
    /// Wall entries of each prior are zeroed and the rest rescaled to unit mass.
    /// An all-zero prior marks its target as eliminated from the start.
    pub fn new(
        grid: GridMap,
        config: &TrackerConfig,
        priors: Vec<BeliefMap>,
    ) -> Result<Self, FilterError> {
        config.validate()?;
        let sensor = SensorModel::from_variance(config.sensor_variance)?;
        if priors.len() != config.target_count() {
            return Err(FilterError::PriorCount {
                expected: config.target_count(),
                found: priors.len(),
            });
        }

        let mut beliefs = Vec::with_capacity(priors.len());
        let mut eliminated = Vec::with_capacity(priors.len());
        for (target, prior) in priors.into_iter().enumerate() {
            let belief = sanitize_prior(&grid, target, prior)?;
            eliminated.push(belief.is_zero());
            beliefs.push(belief);
        }

        Ok(Self {
            grid,
            sensor,
            modes: config.modes.clone(),
            beliefs,
            eliminated,
            cache: TransitionCache::new(config.cache_capacity),
            turn: 0,
            last_report: None,
        })
    }

    /// Starts a session with a uniform prior for every target.
    pub fn with_uniform_priors(grid: GridMap, config: &TrackerConfig) -> Result<Self, FilterError> {
        let priors = vec![BeliefMap::uniform(&grid); config.target_count()];
        Self::new(grid, config, priors)
    }

    pub fn grid(&self) -> &GridMap {
        &self.grid
    }

    pub fn sensor(&self) -> &SensorModel {
        &self.sensor
    }

    pub fn modes(&self) -> &[BehaviorMode] {
        &self.modes
    }

    pub fn target_count(&self) -> usize {
        self.beliefs.len()
    }

    pub fn beliefs(&self) -> &[BeliefMap] {
        &self.beliefs
    }

    pub fn belief(&self, target: usize) -> Option<&BeliefMap> {
        self.beliefs.get(target)
    }

    pub fn is_eliminated(&self, target: usize) -> bool {
        self.eliminated.get(target).copied().unwrap_or(true)
    }

    /// Number of completed updates.
    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn last_report(&self) -> Option<&UpdateReport> {
        self.last_report.as_ref()
    }

    pub fn cache(&self) -> &TransitionCache {
        &self.cache
    }

    /// Runs one filter turn for every target.
    ///
    /// `evidence` and `eliminated` carry one entry per target; evidence of an
    /// eliminated target is ignored. Once a target is eliminated it stays
    /// eliminated, whatever later flags say.
    ///
    /// Nothing a turn's evidence can do makes this fail: a posterior with no
    /// surviving mass resets to uniform and is reported as
    /// [`TargetOutcome::Reset`]. Errors only flag inputs that break the caller's
    /// side of the contract: slices of the wrong length, or an observer that is
    /// off the grid or inside a wall. A simulator feeding its own true observer
    /// position never hits the latter.
    pub fn update(
        &mut self,
        evidence: &[f64],
        observer: Cell,
        eliminated: &[bool],
    ) -> Result<&[BeliefMap], FilterError> {
        let targets = self.target_count();
        check_length("evidence", targets, evidence.len())?;
        check_length("eliminated", targets, eliminated.len())?;
        if !self.grid.is_open(observer) {
            return Err(FilterError::ObserverPosition(observer));
        }

        self.turn += 1;
        let mut models: HashMap<BehaviorMode, Arc<TransitionModel>> = HashMap::new();
        let mut outcomes = Vec::with_capacity(targets);

        for target in 0..targets {
            if eliminated[target] {
                self.eliminated[target] = true;
            }
            if self.eliminated[target] {
                self.beliefs[target].clear();
                outcomes.push(TargetOutcome::Eliminated);
                continue;
            }

            let mode = self.modes[target];
            let model = models
                .entry(mode)
                .or_insert_with(|| self.cache.get_or_build(&self.grid, observer, mode));

            let mut posterior = model.predict(&self.beliefs[target]);
            let likelihood = self.sensor.likelihood(&self.grid, observer, evidence[target]);
            posterior.weight_by(&likelihood);

            let total = posterior.total();
            let outcome = if total > 0.0 && total.is_finite() {
                posterior.divide_by(total);
                TargetOutcome::Updated {
                    evidence_mass: total,
                }
            } else {
                // TODO: this discards the accumulated belief; consider widening the
                // prediction instead of resetting once tracking accuracy is measured.
                event!(
                    target: "pacbelief_core::filter",
                    Level::WARN,
                    turn = self.turn,
                    target_index = target,
                    evidence = evidence[target],
                    observer = %observer,
                    "belief collapsed; resetting to uniform"
                );
                posterior = BeliefMap::uniform(&self.grid);
                TargetOutcome::Reset
            };

            if tracing::enabled!(Level::DEBUG) {
                event!(
                    target: "pacbelief_core::filter",
                    Level::DEBUG,
                    turn = self.turn,
                    target_index = target,
                    mode = %mode,
                    evidence = evidence[target],
                    entropy = posterior.entropy(),
                    most_likely = ?posterior.argmax(),
                );
            }

            self.beliefs[target] = posterior;
            outcomes.push(outcome);
        }

        self.last_report = Some(UpdateReport {
            turn: self.turn,
            observer,
            outcomes,
        });
        Ok(&self.beliefs)
    }
}

fn check_length(input: &'static str, expected: usize, found: usize) -> Result<(), FilterError> {
    if expected == found {
        Ok(())
    } else {
        Err(FilterError::InputLength {
            input,
            expected,
            found,
        })
    }
}

fn sanitize_prior(
    grid: &GridMap,
    target: usize,
    prior: BeliefMap,
) -> Result<BeliefMap, FilterError> {
    if !prior.matches(grid) {
        return Err(FilterError::PriorShape {
            target,
            width: grid.width(),
            height: grid.height(),
            found_width: prior.width(),
            found_height: prior.height(),
        });
    }

    let mut belief = BeliefMap::zeros_like(grid);
    for (cell, prob) in prior.iter() {
        if !prob.is_finite() || prob < 0.0 {
            return Err(FilterError::InvalidPrior { target, cell });
        }
        if grid.is_open(cell) {
            belief.set(cell, prob);
        }
    }

    let total = belief.total();
    if total > 0.0 {
        belief.divide_by(total);
    }
    Ok(belief)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corridor() -> GridMap {
        GridMap::open(5, 1).expect("grid")
    }

    fn config(modes: Vec<BehaviorMode>) -> TrackerConfig {
        TrackerConfig::new(1.0, modes)
    }

    #[test]
    fn rejects_mismatched_prior_count() {
        let grid = corridor();
        let err = BeliefFilter::new(
            grid.clone(),
            &config(vec![BehaviorMode::Scared, BehaviorMode::Afraid]),
            vec![BeliefMap::uniform(&grid)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            FilterError::PriorCount {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn rejects_invalid_variance_before_tracking() {
        let grid = corridor();
        let err = BeliefFilter::with_uniform_priors(
            grid,
            &TrackerConfig::new(-1.0, vec![BehaviorMode::Confused]),
        )
        .unwrap_err();
        assert_eq!(err, FilterError::Config(ConfigError::InvalidVariance(-1.0)));
    }

    #[test]
    fn rejects_negative_prior_entries() {
        let grid = corridor();
        let prior = BeliefMap::from_columns(vec![vec![-0.5], vec![1.5], vec![0.0], vec![0.0], vec![0.0]])
            .expect("map");
        let err = BeliefFilter::new(grid, &config(vec![BehaviorMode::Confused]), vec![prior])
            .unwrap_err();
        assert_eq!(
            err,
            FilterError::InvalidPrior {
                target: 0,
                cell: Cell::new(0, 0)
            }
        );
    }

    #[test]
    fn prior_walls_are_zeroed_and_renormalized() {
        let grid = GridMap::from_ascii(".%.\n").expect("layout");
        let prior =
            BeliefMap::from_columns(vec![vec![0.25], vec![0.5], vec![0.25]]).expect("map");
        let filter =
            BeliefFilter::new(grid, &config(vec![BehaviorMode::Confused]), vec![prior]).expect("filter");
        let belief = filter.belief(0).expect("belief");
        assert_eq!(belief.get(Cell::new(1, 0)), 0.0);
        assert!((belief.get(Cell::new(0, 0)) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rejects_wrong_input_lengths_and_bad_observer() {
        let grid = GridMap::from_ascii("..%\n").expect("layout");
        let mut filter =
            BeliefFilter::with_uniform_priors(grid, &config(vec![BehaviorMode::Afraid])).expect("filter");
        assert!(matches!(
            filter.update(&[], Cell::new(0, 0), &[false]),
            Err(FilterError::InputLength {
                input: "evidence",
                ..
            })
        ));
        assert!(matches!(
            filter.update(&[1.0], Cell::new(0, 0), &[]),
            Err(FilterError::InputLength {
                input: "eliminated",
                ..
            })
        ));
        assert_eq!(
            filter.update(&[1.0], Cell::new(2, 0), &[false]).unwrap_err(),
            FilterError::ObserverPosition(Cell::new(2, 0))
        );
        assert_eq!(filter.turn(), 0);
    }

    #[test]
    fn update_concentrates_on_consistent_cells() {
        let grid = corridor();
        let mut filter =
            BeliefFilter::with_uniform_priors(grid, &config(vec![BehaviorMode::Confused]))
                .expect("filter");
        // n = 4: a reading of 4 is only reachable from distances 2 through 6.
        let beliefs = filter
            .update(&[4.0], Cell::new(0, 0), &[false])
            .expect("update");
        let belief = &beliefs[0];
        assert!((belief.total() - 1.0).abs() < 1e-12);
        assert_eq!(belief.get(Cell::new(0, 0)), 0.0);
        assert_eq!(belief.get(Cell::new(1, 0)), 0.0);
        assert!(belief.get(Cell::new(4, 0)) > 0.0);
        assert!(matches!(
            filter.last_report().expect("report").outcomes[0],
            TargetOutcome::Updated { .. }
        ));
    }

    #[test]
    fn elimination_is_sticky() {
        let grid = corridor();
        let mut filter = BeliefFilter::with_uniform_priors(
            grid,
            &config(vec![BehaviorMode::Scared, BehaviorMode::Scared]),
        )
        .expect("filter");
        filter
            .update(&[2.0, 2.0], Cell::new(0, 0), &[true, false])
            .expect("update");
        let beliefs = filter
            .update(&[2.0, 2.0], Cell::new(0, 0), &[false, false])
            .expect("update");
        assert!(beliefs[0].is_zero());
        assert!((beliefs[1].total() - 1.0).abs() < 1e-12);
        assert!(filter.is_eliminated(0));
        assert!(!filter.is_eliminated(1));
        assert_eq!(
            filter.last_report().expect("report").outcomes[0],
            TargetOutcome::Eliminated
        );
    }

    #[test]
    fn shared_mode_builds_one_model_per_turn() {
        let grid = corridor();
        let mut filter = BeliefFilter::with_uniform_priors(
            grid,
            &config(vec![BehaviorMode::Afraid, BehaviorMode::Afraid, BehaviorMode::Scared]),
        )
        .expect("filter");
        filter
            .update(&[2.0, 2.0, 2.0], Cell::new(0, 0), &[false; 3])
            .expect("update");
        assert_eq!(filter.cache().misses(), 2);
        assert_eq!(filter.cache().hits(), 0);
    }

    #[test]
    fn collapse_resets_to_uniform() {
        let grid = GridMap::from_ascii("..%.\n").expect("layout");
        let mut filter =
            BeliefFilter::with_uniform_priors(grid, &config(vec![BehaviorMode::Confused]))
                .expect("filter");
        filter
            .update(&[500.0], Cell::new(0, 0), &[false])
            .expect("update");
        let belief = filter.belief(0).expect("belief");
        for cell in [Cell::new(0, 0), Cell::new(1, 0), Cell::new(3, 0)] {
            assert!((belief.get(cell) - 1.0 / 3.0).abs() < 1e-12);
        }
        assert_eq!(belief.get(Cell::new(2, 0)), 0.0);
        assert_eq!(filter.last_report().expect("report").reset_count(), 1);
    }

    #[test]
    fn no_reading_is_an_error() {
        let grid = corridor();
        let mut filter = BeliefFilter::with_uniform_priors(
            grid,
            &config(vec![BehaviorMode::Scared, BehaviorMode::Afraid]),
        )
        .expect("filter");
        for reading in [f64::NAN, f64::INFINITY, -40.0, 2.5] {
            filter
                .update(&[reading, 2.0], Cell::new(0, 0), &[false, false])
                .expect("evidence never fails an update");
            let report = filter.last_report().expect("report");
            assert_eq!(report.outcomes[0], TargetOutcome::Reset);
            assert!((filter.belief(0).expect("belief").total() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn all_zero_prior_starts_eliminated() {
        let grid = corridor();
        let filter = BeliefFilter::new(
            grid.clone(),
            &config(vec![BehaviorMode::Confused, BehaviorMode::Confused]),
            vec![BeliefMap::zeros_like(&grid), BeliefMap::uniform(&grid)],
        )
        .expect("filter");
        assert!(filter.is_eliminated(0));
        assert!(!filter.is_eliminated(1));
    }
}
