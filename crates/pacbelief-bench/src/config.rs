use crate::layout::{Layout, LayoutError};
use pacbelief_core::config::MAX_SENSOR_VARIANCE;
use pacbelief_core::{BehaviorMode, TrackerConfig};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const DEFAULT_TURNS: usize = 100;
const DEFAULT_CACHE_CAPACITY: usize = 8;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root tracking-session configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BenchmarkConfig {
    pub run_id: String,
    pub session: SessionConfig,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchmarkConfig {
    /// Load configuration from a YAML file on disk.
    ///
    /// A relative `session.layout_path` is resolved against the config file's directory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: BenchmarkConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        if let Some(base) = path.parent() {
            cfg.session.resolve_layout_path(base);
        }
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.session.validate()?;
        self.outputs.validate(&self.run_id)?;
        self.logging.normalize();
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
            plots_dir: resolve_template(&self.run_id, &self.outputs.plots_dir),
        }
    }

    pub fn tracker_config(&self) -> Result<TrackerConfig, pacbelief_core::ConfigError> {
        self.session.tracker_config()
    }
}

/// Simulation block: the world, the sensor and the ghosts being tracked.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SessionConfig {
    pub seed: Option<u64>,
    #[serde(default = "default_turns")]
    pub turns: usize,
    /// Inline layout text (`%` wall, `P` observer, `G` ghost).
    #[serde(default)]
    pub layout: Option<String>,
    #[serde(default)]
    pub layout_path: Option<PathBuf>,
    /// Falls back to `PACBELIEF_SENSOR_VARIANCE`, then the tracker default, when omitted.
    #[serde(default)]
    pub sensor_variance: Option<f64>,
    /// One behavior mode per `G` marker, in layout reading order.
    pub ghosts: Vec<BehaviorMode>,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl SessionConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.turns == 0 {
            return Err(ValidationError::InvalidField {
                field: "session.turns".to_string(),
                message: "number of turns must be greater than zero".to_string(),
            });
        }

        match (&self.layout, &self.layout_path) {
            (Some(_), Some(_)) => {
                return Err(ValidationError::InvalidField {
                    field: "session.layout".to_string(),
                    message: "specify either layout or layout_path, not both".to_string(),
                });
            }
            (None, None) => {
                return Err(ValidationError::InvalidField {
                    field: "session.layout".to_string(),
                    message: "a layout or layout_path is required".to_string(),
                });
            }
            (Some(text), None) if text.trim().is_empty() => {
                return Err(ValidationError::InvalidField {
                    field: "session.layout".to_string(),
                    message: "inline layout must not be empty".to_string(),
                });
            }
            _ => {}
        }

        if let Some(variance) = self.sensor_variance {
            if !variance.is_finite() || variance <= 0.0 || variance > MAX_SENSOR_VARIANCE {
                return Err(ValidationError::InvalidField {
                    field: "session.sensor_variance".to_string(),
                    message: format!(
                        "sensor variance must be in (0, {MAX_SENSOR_VARIANCE}] (got {variance})"
                    ),
                });
            }
        }

        if self.ghosts.is_empty() {
            return Err(ValidationError::InvalidField {
                field: "session.ghosts".to_string(),
                message: "at least one ghost must be tracked".to_string(),
            });
        }

        Ok(())
    }

    fn resolve_layout_path(&mut self, base: &Path) {
        if let Some(path) = self.layout_path.as_mut() {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// Parses the inline layout, or reads `layout_path` when none is given.
    pub fn load_layout(&self) -> Result<Layout, LayoutError> {
        match (&self.layout, &self.layout_path) {
            (Some(text), _) => Layout::parse(text),
            (None, Some(path)) => Layout::from_path(path),
            (None, None) => Err(LayoutError::MissingSource),
        }
    }

    pub fn tracker_config(&self) -> Result<TrackerConfig, pacbelief_core::ConfigError> {
        let mut tracker = match self.sensor_variance {
            Some(variance) => TrackerConfig::new(variance, self.ghosts.clone()),
            None => TrackerConfig {
                modes: self.ghosts.clone(),
                ..TrackerConfig::from_env(self.ghosts.len())?
            },
        };
        tracker.cache_capacity = self.cache_capacity;
        Ok(tracker)
    }
}

fn default_turns() -> usize {
    DEFAULT_TURNS
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
    pub plots_dir: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
            ("outputs.plots_dir", &self.plots_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
    pub plots_dir: PathBuf,
}

impl ResolvedOutputs {
    /// Structured telemetry lands beside the summary file.
    pub fn telemetry_path(&self) -> PathBuf {
        self.summary_md
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .join("telemetry.jsonl")
    }
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}
