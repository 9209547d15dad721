use std::path::PathBuf;

use clap::Parser;

use pacbelief_bench::config::{BenchmarkConfig, ResolvedOutputs};
use pacbelief_bench::logging::init_logging;
use pacbelief_bench::session::SessionRunner;

/// Simulated ghost-tracking sessions for the belief filter.
#[derive(Debug, Parser)]
#[command(
    name = "pacbelief-bench",
    author,
    version,
    about = "Deterministic ghost-tracking session harness"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/track.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of turns to simulate.
    #[arg(long, value_name = "TURNS")]
    turns: Option<usize>,

    /// Override the RNG seed for ghost motion and sensor noise.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Override the sensor variance.
    #[arg(long, value_name = "VARIANCE")]
    sensor_variance: Option<f64>,

    /// Exit after validating the configuration and layout (no session is run).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = BenchmarkConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(turns) = cli.turns {
        config.session.turns = turns;
    }

    if let Some(seed) = cli.seed {
        config.session.seed = Some(seed);
    }

    if let Some(variance) = cli.sensor_variance {
        config.session.sensor_variance = Some(variance);
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let ghost_count = config.session.ghosts.len();
    let run_id = config.run_id.clone();
    let turns = config.session.turns;

    println!(
        "Loaded configuration '{run_id}' tracking {ghost_count} ghost{} for up to {turns} turns",
        if ghost_count == 1 { "" } else { "s" }
    );

    let logging_guard = init_logging(&config.logging, &outputs, &run_id)?;
    let mut runner = SessionRunner::new(config, outputs)?;
    if let Some(guard) = logging_guard.as_ref() {
        runner = runner.with_telemetry_path(guard.telemetry_path());
    }

    if cli.validate_only {
        let grid = &runner.layout().grid;
        println!(
            "Validation-only mode: {}x{} layout with {} open cells, session skipped.",
            grid.width(),
            grid.height(),
            grid.open_count()
        );
        return Ok(());
    }

    let summary = runner.run()?;
    println!(
        "Session complete for '{run_id}': {} turns, {} of {ghost_count} ghosts caught, {} rows at {}",
        summary.turns_played,
        summary.ghosts_caught,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    println!("Summary table: {}", summary.summary_path.display());
    for plot_path in &summary.plot_paths {
        println!("Belief heatmap: {}", plot_path.display());
    }
    if let Some(telemetry_path) = summary.telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }

    Ok(())
}
