//! Session-level tracker configuration, fixed once tracking starts.

use crate::transition::BehaviorMode;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

pub const DEFAULT_SENSOR_VARIANCE: f64 = 1.0;
pub const DEFAULT_CACHE_CAPACITY: usize = 8;
/// Largest accepted sensor variance. Each noise draw costs one Bernoulli trial per
/// unit of `n = variance / 0.25`, so this caps a draw at 40,000 trials.
pub const MAX_SENSOR_VARIANCE: f64 = 10_000.0;

const ENV_SENSOR_VARIANCE: &str = "PACBELIEF_SENSOR_VARIANCE";
const ENV_GHOST_MODE: &str = "PACBELIEF_GHOST_MODE";

/// Fatal configuration errors, surfaced before the first update.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("sensor variance must be a positive finite number (got {0})")]
    InvalidVariance(f64),
    #[error("sensor variance {0} exceeds the supported maximum of {MAX_SENSOR_VARIANCE}")]
    VarianceTooLarge(f64),
    #[error("unrecognized behavior mode '{0}' (expected scared, afraid or confused)")]
    UnknownMode(String),
    #[error("at least one target must be tracked")]
    NoTargets,
    #[error("binomial noise model rejected its parameters: {0}")]
    Distribution(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub sensor_variance: f64,
    /// One behavior mode per tracked target, in target order.
    pub modes: Vec<BehaviorMode>,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl TrackerConfig {
    pub fn new(sensor_variance: f64, modes: Vec<BehaviorMode>) -> Self {
        Self {
            sensor_variance,
            modes,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Every target shares `mode`.
    pub fn with_shared_mode(sensor_variance: f64, mode: BehaviorMode, targets: usize) -> Self {
        Self::new(sensor_variance, vec![mode; targets])
    }

    /// Reads `PACBELIEF_SENSOR_VARIANCE` and `PACBELIEF_GHOST_MODE`, falling back to defaults
    /// when unset. A mode that is set but unrecognized is an error.
    pub fn from_env(targets: usize) -> Result<Self, ConfigError> {
        Self::from_lookup(targets, |key| env::var(key).ok())
    }

    fn from_lookup(
        targets: usize,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let variance = lookup(ENV_SENSOR_VARIANCE)
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite())
            .unwrap_or(DEFAULT_SENSOR_VARIANCE);
        let mode = match lookup(ENV_GHOST_MODE) {
            Some(raw) => raw.parse::<BehaviorMode>()?,
            None => BehaviorMode::default(),
        };
        let config = Self::with_shared_mode(variance, mode, targets);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_variance(self.sensor_variance)?;
        if self.modes.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        Ok(())
    }

    pub fn target_count(&self) -> usize {
        self.modes.len()
    }
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

pub(crate) fn check_variance(variance: f64) -> Result<(), ConfigError> {
    if !variance.is_finite() || variance <= 0.0 {
        return Err(ConfigError::InvalidVariance(variance));
    }
    if variance > MAX_SENSOR_VARIANCE {
        return Err(ConfigError::VarianceTooLarge(variance));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_variance() {
        for variance in [0.0, -1.5, f64::NAN, f64::INFINITY] {
            let config = TrackerConfig::with_shared_mode(variance, BehaviorMode::Confused, 1);
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidVariance(_))
            ));
        }
    }

    #[test]
    fn rejects_variance_above_cap() {
        let config = TrackerConfig::with_shared_mode(1e8, BehaviorMode::Scared, 1);
        assert_eq!(config.validate(), Err(ConfigError::VarianceTooLarge(1e8)));
        let edge = TrackerConfig::with_shared_mode(MAX_SENSOR_VARIANCE, BehaviorMode::Scared, 1);
        edge.validate().expect("cap itself is accepted");
    }

    fn vars(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn env_defaults_apply_when_unset() {
        let config = TrackerConfig::from_lookup(2, vars(&[])).expect("defaults");
        assert_eq!(config.sensor_variance, DEFAULT_SENSOR_VARIANCE);
        assert_eq!(config.modes, vec![BehaviorMode::Confused; 2]);
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
    }

    #[test]
    fn env_values_override_defaults() {
        let config = TrackerConfig::from_lookup(
            3,
            vars(&[
                ("PACBELIEF_SENSOR_VARIANCE", " 6.5 "),
                ("PACBELIEF_GHOST_MODE", "Scared"),
            ]),
        )
        .expect("env config");
        assert_eq!(config.sensor_variance, 6.5);
        assert_eq!(config.modes, vec![BehaviorMode::Scared; 3]);
    }

    #[test]
    fn unparsable_env_variance_falls_back() {
        let config =
            TrackerConfig::from_lookup(1, vars(&[("PACBELIEF_SENSOR_VARIANCE", "loud")]))
                .expect("fallback");
        assert_eq!(config.sensor_variance, DEFAULT_SENSOR_VARIANCE);
    }

    #[test]
    fn env_errors_surface() {
        assert_eq!(
            TrackerConfig::from_lookup(1, vars(&[("PACBELIEF_GHOST_MODE", "brave")])),
            Err(ConfigError::UnknownMode("brave".into()))
        );
        assert_eq!(
            TrackerConfig::from_lookup(1, vars(&[("PACBELIEF_SENSOR_VARIANCE", "-2")])),
            Err(ConfigError::InvalidVariance(-2.0))
        );
        assert_eq!(
            TrackerConfig::from_lookup(0, vars(&[])),
            Err(ConfigError::NoTargets)
        );
    }

    #[test]
    fn rejects_empty_target_list() {
        let config = TrackerConfig::new(2.0, Vec::new());
        assert_eq!(config.validate(), Err(ConfigError::NoTargets));
    }

    #[test]
    fn deserializes_modes_by_name() {
        let config: TrackerConfig = serde_json::from_str(
            r#"{"sensor_variance": 4.0, "modes": ["scared", "afraid", "confused"]}"#,
        )
        .expect("parse");
        assert_eq!(
            config.modes,
            vec![
                BehaviorMode::Scared,
                BehaviorMode::Afraid,
                BehaviorMode::Confused
            ]
        );
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
        config.validate().expect("valid");
    }

    #[test]
    fn unknown_mode_fails_to_parse() {
        let parsed = serde_json::from_str::<TrackerConfig>(
            r#"{"sensor_variance": 4.0, "modes": ["brave"]}"#,
        );
        assert!(parsed.is_err());
    }
}
