use std::fs;
use std::path::{Path, PathBuf};

use pacbelief_core::{BehaviorMode, BeliefMap, BeliefMetrics, Cell, GridMap, UpdateReport};
use plotters::prelude::*;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

const CONFIDENCE_LEVEL: f64 = 0.95;
const CELL_PIXELS: i32 = 24;
const WALL_COLOR: RGBColor = RGBColor(48, 48, 48);

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("expected {expected} ghost entries, got {found}")]
    GhostCount { expected: usize, found: usize },
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to render plot: {0}")]
    Plot(String),
}

/// Accumulates per-ghost tracking quality over a session.
pub struct SessionAnalytics {
    run_id: String,
    ghosts: Vec<GhostAccumulator>,
    turns: u64,
    resets: usize,
}

impl SessionAnalytics {
    pub fn new(run_id: impl Into<String>, modes: &[BehaviorMode]) -> Self {
        Self {
            run_id: run_id.into(),
            ghosts: modes.iter().copied().map(GhostAccumulator::new).collect(),
            turns: 0,
            resets: 0,
        }
    }

    /// Records one filter turn. `truths` holds each ghost's true cell, `None` once caught.
    pub fn record_turn(
        &mut self,
        beliefs: &[BeliefMap],
        truths: &[Option<Cell>],
        report: &UpdateReport,
    ) -> Result<(), AnalyticsError> {
        for found in [beliefs.len(), truths.len(), report.outcomes.len()] {
            if found != self.ghosts.len() {
                return Err(AnalyticsError::GhostCount {
                    expected: self.ghosts.len(),
                    found,
                });
            }
        }

        self.turns = report.turn;
        self.resets += report.reset_count();
        for ((acc, belief), truth) in self.ghosts.iter_mut().zip(beliefs).zip(truths) {
            if let Some(truth) = truth {
                acc.record(belief, *truth);
            }
        }
        Ok(())
    }

    pub fn record_capture(&mut self, ghost: usize, turn: u64) {
        if let Some(acc) = self.ghosts.get_mut(ghost) {
            acc.caught_turn.get_or_insert(turn);
        }
    }

    pub fn finalize(self) -> SessionReport {
        let z = z_score(CONFIDENCE_LEVEL);
        SessionReport {
            run_id: self.run_id,
            turns: self.turns,
            resets: self.resets,
            ghosts: self
                .ghosts
                .into_iter()
                .enumerate()
                .map(|(index, acc)| acc.into_report(index, z))
                .collect(),
        }
    }
}

struct GhostAccumulator {
    mode: BehaviorMode,
    turns_tracked: usize,
    hits: usize,
    entropy_total: f64,
    truth_probabilities: Vec<f64>,
    caught_turn: Option<u64>,
}

impl GhostAccumulator {
    fn new(mode: BehaviorMode) -> Self {
        Self {
            mode,
            turns_tracked: 0,
            hits: 0,
            entropy_total: 0.0,
            truth_probabilities: Vec::new(),
            caught_turn: None,
        }
    }

    fn record(&mut self, belief: &BeliefMap, truth: Cell) {
        let metrics = BeliefMetrics::from_belief(belief);
        self.turns_tracked += 1;
        self.entropy_total += metrics.entropy;
        self.truth_probabilities.push(belief.get(truth));
        if metrics.most_likely == Some(truth) {
            self.hits += 1;
        }
    }

    fn into_report(self, index: usize, z: f64) -> GhostReport {
        let tracked = self.turns_tracked as f64;
        let (mean_truth_probability, ci95) = mean_with_interval(&self.truth_probabilities, z);
        GhostReport {
            index,
            mode: self.mode,
            turns_tracked: self.turns_tracked,
            mean_entropy: if self.turns_tracked == 0 {
                0.0
            } else {
                self.entropy_total / tracked
            },
            mean_truth_probability,
            ci95,
            hit_rate: if self.turns_tracked == 0 {
                0.0
            } else {
                self.hits as f64 / tracked
            },
            caught_turn: self.caught_turn,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub run_id: String,
    pub turns: u64,
    pub resets: usize,
    pub ghosts: Vec<GhostReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GhostReport {
    pub index: usize,
    pub mode: BehaviorMode,
    pub turns_tracked: usize,
    pub mean_entropy: f64,
    /// Mean belief mass on the ghost's true cell.
    pub mean_truth_probability: f64,
    pub ci95: (f64, f64),
    /// Share of tracked turns where the most likely cell was the true one.
    pub hit_rate: f64,
    pub caught_turn: Option<u64>,
}

impl SessionReport {
    pub fn caught_count(&self) -> usize {
        self.ghosts
            .iter()
            .filter(|ghost| ghost.caught_turn.is_some())
            .count()
    }

    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let mut rows = String::new();
        rows.push_str("# Tracking Summary\n\n");
        rows.push_str(&format!(
            "Run `{}`: {} turns, {} of {} ghosts caught, {} belief resets\n\n",
            self.run_id,
            self.turns,
            self.caught_count(),
            self.ghosts.len(),
            self.resets
        ));
        rows.push_str("| Ghost | Mode | Turns tracked | Mean entropy | P(true cell) | 95% CI | Hit % | Caught on turn |\n");
        rows.push_str("|-------|------|---------------|--------------|--------------|--------|-------|----------------|\n");

        for ghost in &self.ghosts {
            rows.push_str(&format!(
                "| {index} | {mode} | {tracked} | {entropy:.3} | {truth:.3} | [{ci_low:.3}, {ci_high:.3}] | {hit:.1}% | {caught} |\n",
                index = ghost.index,
                mode = ghost.mode,
                tracked = ghost.turns_tracked,
                entropy = ghost.mean_entropy,
                truth = ghost.mean_truth_probability,
                ci_low = ghost.ci95.0,
                ci_high = ghost.ci95.1,
                hit = ghost.hit_rate * 100.0,
                caught = ghost
                    .caught_turn
                    .map(|turn| turn.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ));
        }

        fs::write(path.as_ref(), rows).map_err(|source| AnalyticsError::Io {
            context: "writing summary markdown",
            source,
        })
    }
}

/// Renders one heatmap per ghost into `dir` and returns the written paths.
///
/// Darker red means more belief mass; walls are dark grey, the observer is a
/// green dot and a ghost still in play is a blue dot.
pub fn render_heatmaps(
    dir: impl AsRef<Path>,
    grid: &GridMap,
    beliefs: &[BeliefMap],
    observer: Cell,
    truths: &[Option<Cell>],
) -> Result<Vec<PathBuf>, AnalyticsError> {
    let dir = dir.as_ref();
    if !dir.as_os_str().is_empty() {
        fs::create_dir_all(dir).map_err(|source| AnalyticsError::Io {
            context: "creating plots directory",
            source,
        })?;
    }

    let mut paths = Vec::with_capacity(beliefs.len());
    for (index, belief) in beliefs.iter().enumerate() {
        let path = dir.join(format!("ghost_{index}_belief.png"));
        let truth = truths.get(index).copied().flatten();
        render_heatmap(&path, grid, belief, observer, truth)?;
        paths.push(path);
    }
    Ok(paths)
}

fn render_heatmap(
    path: &Path,
    grid: &GridMap,
    belief: &BeliefMap,
    observer: Cell,
    truth: Option<Cell>,
) -> Result<(), AnalyticsError> {
    let width = grid.width() as i32 * CELL_PIXELS;
    let height = grid.height() as i32 * CELL_PIXELS;
    let root = BitMapBackend::new(path, (width as u32, height as u32)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

    let peak = belief.iter().map(|(_, mass)| mass).fold(0.0f64, f64::max);
    // Row 0 of the image is the top of the maze.
    let corner = |cell: Cell| {
        let left = cell.x as i32 * CELL_PIXELS;
        let top = (grid.height() - 1 - cell.y) as i32 * CELL_PIXELS;
        (left, top)
    };

    for x in 0..grid.width() {
        for y in 0..grid.height() {
            let cell = Cell::new(x, y);
            let color = if grid.is_wall(x, y) {
                WALL_COLOR
            } else {
                heat_color(belief.get(cell), peak)
            };
            let (left, top) = corner(cell);
            root.draw(&Rectangle::new(
                [(left, top), (left + CELL_PIXELS, top + CELL_PIXELS)],
                color.filled(),
            ))
            .map_err(|e| AnalyticsError::Plot(e.to_string()))?;
        }
    }

    let radius = CELL_PIXELS / 3;
    let mut markers = vec![(observer, GREEN)];
    if let Some(truth) = truth {
        markers.push((truth, BLUE));
    }
    for (cell, color) in markers {
        let (left, top) = corner(cell);
        let center = (left + CELL_PIXELS / 2, top + CELL_PIXELS / 2);
        root.draw(&Circle::new(center, radius, color.filled()))
            .map_err(|e| AnalyticsError::Plot(e.to_string()))?;
    }

    root.present()
        .map_err(|e| AnalyticsError::Plot(e.to_string()))
}

fn heat_color(mass: f64, peak: f64) -> RGBColor {
    let intensity = if peak > 0.0 {
        (mass / peak).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let fade = (255.0 * (1.0 - intensity)).round() as u8;
    RGBColor(255, fade, fade)
}

fn z_score(level: f64) -> f64 {
    Normal::new(0.0, 1.0)
        .map(|normal| normal.inverse_cdf(0.5 + level / 2.0))
        .unwrap_or(1.96)
}

fn mean_with_interval(samples: &[f64], z: f64) -> (f64, (f64, f64)) {
    if samples.is_empty() {
        return (0.0, (0.0, 0.0));
    }
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    if samples.len() == 1 {
        return (mean, (mean, mean));
    }
    let variance = samples
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (samples.len() as f64 - 1.0);
    let margin = z * (variance / samples.len() as f64).sqrt();
    (mean, (mean - margin, mean + margin))
}
