mod ghosts;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use pacbelief_bot::{Direction, Policy, PolicyContext, PursuitPolicy};
use pacbelief_core::{
    BehaviorMode, BeliefFilter, BeliefMap, BeliefMetrics, Cell, EvidenceGenerator, FilterError,
    TargetOutcome, TrackerConfig, TransitionCache,
};
use rand::{SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use crate::analytics::{AnalyticsError, SessionAnalytics, render_heatmaps};
use crate::config::{BenchmarkConfig, ResolvedOutputs};
use crate::layout::{Layout, LayoutError};
use ghosts::{Ghost, step_ghost};

/// Drives a simulated tracking session. Each turn the ghosts move, the sensor
/// reads, the filter updates and then the observer takes one step.
pub struct SessionRunner {
    config: BenchmarkConfig,
    outputs: ResolvedOutputs,
    layout: Layout,
    tracker: TrackerConfig,
    logging_enabled: bool,
    telemetry_path: Option<PathBuf>,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub turns_played: u64,
    pub ghosts_caught: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub plot_paths: Vec<PathBuf>,
    pub telemetry_path: Option<PathBuf>,
}

impl SessionRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: BenchmarkConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let layout = config.session.load_layout()?;
        if layout.ghost_count() != config.session.ghosts.len() {
            return Err(RunnerError::GhostCount {
                layout: layout.ghost_count(),
                configured: config.session.ghosts.len(),
            });
        }
        let tracker = config.tracker_config().map_err(FilterError::from)?;
        tracker.validate().map_err(FilterError::from)?;

        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            layout,
            tracker,
            telemetry_path: None,
        })
    }

    /// Report `path` as the run's telemetry file in the summary.
    pub fn with_telemetry_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.telemetry_path = Some(path.into());
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Execute the session, streaming one JSONL row per turn to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;

        let grid = self.layout.grid.clone();
        let priors = self
            .layout
            .ghost_starts
            .iter()
            .map(|start| BeliefMap::point(&grid, *start))
            .collect();
        let mut filter = BeliefFilter::new(grid.clone(), &self.tracker, priors)?;
        let generator = EvidenceGenerator::new(filter.sensor().clone());
        let mut ghost_cache = TransitionCache::new(self.tracker.cache_capacity);
        let mut policy: Box<dyn Policy> = Box::new(PursuitPolicy::new());
        let mut analytics = SessionAnalytics::new(&self.config.run_id, &self.tracker.modes);
        let mut rng = StdRng::seed_from_u64(self.config.session.seed.unwrap_or(0));

        let mut ghosts: Vec<Ghost> = self
            .layout
            .ghost_starts
            .iter()
            .zip(&self.tracker.modes)
            .map(|(start, mode)| Ghost::new(*start, *mode))
            .collect();
        let mut observer = self.layout.observer_start;
        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rows_written = 0usize;
        let mut turns_played = 0u64;

        for _ in 0..self.config.session.turns {
            let turn = filter.turn() + 1;
            for ghost in ghosts.iter_mut() {
                let Some(position) = ghost.position else {
                    continue;
                };
                let model = ghost_cache.get_or_build(&grid, observer, ghost.mode);
                ghost.position = Some(step_ghost(&model, position, &mut rng));
            }
            self.capture(&mut ghosts, &mut analytics, observer, turn);

            let truths: Vec<Option<Cell>> = ghosts.iter().map(|ghost| ghost.position).collect();
            let evidence: Vec<Option<f64>> = truths
                .iter()
                .map(|truth| truth.map(|cell| generator.sample(cell, observer, &mut rng)))
                .collect();
            let readings: Vec<f64> = evidence.iter().map(|e| e.unwrap_or(0.0)).collect();
            let caught: Vec<bool> = ghosts.iter().map(Ghost::is_caught).collect();

            filter.update(&readings, observer, &caught)?;
            let report = filter
                .last_report()
                .cloned()
                .ok_or(RunnerError::MissingReport)?;
            turns_played = report.turn;
            analytics.record_turn(filter.beliefs(), &truths, &report)?;

            if self.logging_enabled && report.reset_count() > 0 {
                event!(
                    target: "pacbelief_bench::session",
                    Level::INFO,
                    run_id = %self.config.run_id,
                    turn = report.turn,
                    resets = report.reset_count(),
                    "belief reset during session"
                );
            }

            let action = if ghosts.iter().all(Ghost::is_caught) {
                None
            } else {
                let ctx = PolicyContext {
                    grid: &grid,
                    observer,
                    beliefs: &filter,
                    turn: report.turn,
                };
                Some(policy.choose_move(&ctx))
            };

            write_turn_row(
                &mut writer,
                &self.config.run_id,
                report.turn,
                observer,
                action,
                &ghosts,
                &evidence,
                &report.outcomes,
                filter.beliefs(),
            )?;
            rows_written += 1;

            let Some(action) = action else {
                break;
            };

            if let Some(next) = action.apply(observer).filter(|next| grid.is_open(*next)) {
                observer = next;
            }
            self.capture(&mut ghosts, &mut analytics, observer, report.turn);
        }

        writer.flush()?;

        let truths: Vec<Option<Cell>> = ghosts.iter().map(|ghost| ghost.position).collect();
        let plot_paths = match render_heatmaps(
            &self.outputs.plots_dir,
            &grid,
            filter.beliefs(),
            observer,
            &truths,
        ) {
            Ok(paths) => paths,
            Err(err) => {
                eprintln!("WARN: {}", err);
                Vec::new()
            }
        };

        let report = analytics.finalize();
        report.write_markdown(&self.outputs.summary_md)?;

        Ok(RunSummary {
            turns_played,
            ghosts_caught: report.caught_count(),
            rows_written,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            plot_paths,
            telemetry_path: self.telemetry_path.clone(),
        })
    }

    fn capture(
        &self,
        ghosts: &mut [Ghost],
        analytics: &mut SessionAnalytics,
        observer: Cell,
        turn: u64,
    ) {
        for (index, ghost) in ghosts.iter_mut().enumerate() {
            if !ghost.check_capture(observer, turn) {
                continue;
            }
            analytics.record_capture(index, turn);
            if self.logging_enabled {
                event!(
                    target: "pacbelief_bench::session",
                    Level::INFO,
                    run_id = %self.config.run_id,
                    turn,
                    ghost = index,
                    cell = %observer,
                    "ghost caught"
                );
            }
        }
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn write_turn_row(
    writer: &mut BufWriter<File>,
    run_id: &str,
    turn: u64,
    observer: Cell,
    action: Option<Direction>,
    ghosts: &[Ghost],
    evidence: &[Option<f64>],
    outcomes: &[TargetOutcome],
    beliefs: &[BeliefMap],
) -> Result<(), RunnerError> {
    let ghost_rows = ghosts
        .iter()
        .zip(evidence)
        .zip(outcomes)
        .zip(beliefs)
        .enumerate()
        .map(|(index, (((ghost, evidence), outcome), belief))| {
            let metrics = BeliefMetrics::from_belief(belief);
            GhostRow {
                ghost: index,
                mode: ghost.mode,
                truth: ghost.position,
                evidence: *evidence,
                outcome: *outcome,
                truth_probability: ghost.position.map(|cell| belief.get(cell)),
                entropy: metrics.entropy,
                most_likely: metrics.most_likely,
                max_probability: metrics.max_probability,
                belief,
            }
        })
        .collect();

    let row = TurnRow {
        run_id,
        turn,
        observer,
        action: action.map(|direction| direction.to_string()),
        ghosts: ghost_rows,
    };

    serde_json::to_writer(&mut *writer, &row)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// One JSONL row: the state of the session after the filter update of a turn.
#[derive(Debug, Serialize)]
struct TurnRow<'a> {
    run_id: &'a str,
    turn: u64,
    observer: Cell,
    /// Move the observer takes after this update; absent once every ghost is caught.
    action: Option<String>,
    ghosts: Vec<GhostRow<'a>>,
}

#[derive(Debug, Serialize)]
struct GhostRow<'a> {
    ghost: usize,
    mode: BehaviorMode,
    truth: Option<Cell>,
    evidence: Option<f64>,
    outcome: TargetOutcome,
    truth_probability: Option<f64>,
    entropy: f64,
    most_likely: Option<Cell>,
    max_probability: f64,
    belief: &'a BeliefMap,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),
    #[error("filter error: {0}")]
    Filter(#[from] FilterError),
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("layout places {layout} ghosts but {configured} behavior modes are configured")]
    GhostCount { layout: usize, configured: usize },
    #[error("filter produced no update report")]
    MissingReport,
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
}
