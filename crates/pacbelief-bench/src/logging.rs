use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{Level, event};
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::EnvFilter;

use crate::config::{LoggingConfig, ResolvedOutputs};

/// Crates whose events follow the configured level; everything else stays at `warn`.
const TRACKER_TARGETS: [&str; 3] = ["pacbelief_core", "pacbelief_bot", "pacbelief_bench"];

/// Keeps the session's telemetry writer open; dropping it flushes pending events.
pub struct LoggingGuard {
    _worker: WorkerGuard,
    telemetry_path: PathBuf,
}

impl LoggingGuard {
    pub fn telemetry_path(&self) -> &Path {
        &self.telemetry_path
    }
}

/// `EnvFilter` directives applying `level` to the tracker crates only.
pub fn filter_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    std::iter::once("warn".to_string())
        .chain(
            TRACKER_TARGETS
                .iter()
                .map(|target| format!("{target}={level}")),
        )
        .collect::<Vec<_>>()
        .join(",")
}

/// Routes session events as flattened JSON lines into the run's telemetry file.
///
/// Returns `None` when structured logging is off. `RUST_LOG` replaces the
/// configured directives when set.
pub fn init_logging(
    logging: &LoggingConfig,
    outputs: &ResolvedOutputs,
    run_id: &str,
) -> Result<Option<LoggingGuard>> {
    if !logging.enable_structured {
        return Ok(None);
    }

    let telemetry_path = outputs.telemetry_path();
    if let Some(dir) = telemetry_path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating telemetry directory at {}", dir.display()))?;
    }
    let file = File::create(&telemetry_path)
        .with_context(|| format!("creating telemetry file at {}", telemetry_path.display()))?;
    let (writer, worker) = NonBlockingBuilder::default().lossy(false).finish(file);

    let level = logging.level().unwrap_or(Level::INFO);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(level)));

    let subscriber = tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_target(true)
        .with_env_filter(filter)
        .with_writer(writer)
        .finish();

    // Tests may run several sessions in one process; the first subscriber wins.
    let _ = tracing::subscriber::set_global_default(subscriber);

    event!(
        target: "pacbelief_bench::logging",
        Level::INFO,
        run_id,
        telemetry = %telemetry_path.display(),
        "session telemetry opened"
    );

    Ok(Some(LoggingGuard {
        _worker: worker,
        telemetry_path,
    }))
}
