//! Runs a configuration in single or sweep mode and saves the results.

use std::fmt::Write as _;
use std::path::Path;

use color_eyre::eyre::WrapErr;
use serde::Serialize;

use schem_core::annulus::{Annulus, AnnulusSample, TrialModel};
use schem_core::io::atomic_write;
use schem_core::sweep::{GridSweepScheduler, SuccessGrid, SweepAxis, SweepProgress, SweepSummary};

use crate::config::{RunConfig, RunMode};

pub const SINGLE_EVALUATION_FILE: &str = "SingleEvaluation.dat";
pub const GRID_FILE: &str = "SuccessGrid.dat";
pub const SUMMARY_FILE: &str = "sweep_summary.json";
/// Default snapshot directory inside the output directory
pub const SNAPSHOT_DIR: &str = "snapshots";

/// Column width of the saved success grid
const GRID_COLUMN_WIDTH: usize = 15;

/// Result of a completed run
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Single(AnnulusSample),
    Sweep {
        grid: SuccessGrid,
        summary: SweepSummary,
    },
}

/// Execute `config`, writing every output file into `output_dir`
pub fn run(config: &RunConfig, output_dir: &Path) -> color_eyre::Result<RunOutcome> {
    std::fs::create_dir_all(output_dir)
        .wrap_err_with(|| format!("failed to create {}", output_dir.display()))?;

    match config.mode {
        RunMode::Single => run_single(config, output_dir),
        RunMode::Sweep => run_sweep(config, output_dir),
    }
}

fn run_single(config: &RunConfig, output_dir: &Path) -> color_eyre::Result<RunOutcome> {
    let mut annulus =
        Annulus::new(&config.parameters).wrap_err("invalid annulus parameters")?;
    annulus.evolve().wrap_err("failed to evolve annulus")?;

    let path = output_dir.join(SINGLE_EVALUATION_FILE);
    annulus
        .persist(&path)
        .wrap_err_with(|| format!("failed to write {}", path.display()))?;

    let state = annulus.final_state()?;
    tracing::info!(
        "Final state at t={}: sfr={:.6e}, stars formed={:.6e}, passes={}",
        state.time,
        state.star_formation_rate,
        state.stars_formed,
        annulus.evaluate_final_state()
    );
    tracing::info!("Saved {} samples to {}", annulus.history().len(), path.display());
    Ok(RunOutcome::Single(state))
}

fn run_sweep(config: &RunConfig, output_dir: &Path) -> color_eyre::Result<RunOutcome> {
    let mut sweep = config.sweep.clone();
    if sweep.snapshot_odds > 0 && sweep.snapshot_dir.is_none() {
        sweep.snapshot_dir = Some(output_dir.join(SNAPSHOT_DIR));
    }
    if let Some(dir) = &sweep.snapshot_dir {
        std::fs::create_dir_all(dir)
            .wrap_err_with(|| format!("failed to create {}", dir.display()))?;
    }

    let scheduler = GridSweepScheduler::new(sweep).wrap_err("invalid sweep configuration")?;
    let mut grid = scheduler.new_grid();
    let progress = SweepProgress::default();
    let summary = scheduler.run::<Annulus>(
        &config.parameters,
        &config.randomization,
        &mut grid,
        Some(&progress),
    )?;
    tracing::debug!(
        "{} of {} trials folded",
        progress.completed(),
        progress.total()
    );

    let grid_path = output_dir.join(GRID_FILE);
    atomic_write(&grid_path, &format_grid(&grid))
        .wrap_err_with(|| format!("failed to write {}", grid_path.display()))?;

    let report = SweepReport {
        axis_a: AxisReport::new(&scheduler.config().axis_a),
        axis_b: AxisReport::new(&scheduler.config().axis_b),
        summary: &summary,
        grid: grid.rows().map(<[u64]>::to_vec).collect(),
    };
    let summary_path = output_dir.join(SUMMARY_FILE);
    let json = serde_json::to_string_pretty(&report)?;
    atomic_write(&summary_path, &json)
        .wrap_err_with(|| format!("failed to write {}", summary_path.display()))?;

    tracing::info!(
        "Saved {} and {} to {}",
        GRID_FILE,
        SUMMARY_FILE,
        output_dir.display()
    );
    Ok(RunOutcome::Sweep { grid, summary })
}

/// One left-aligned, fixed-width row per axis-A step
#[must_use]
pub fn format_grid(grid: &SuccessGrid) -> String {
    let mut out = String::new();
    for row in grid.rows() {
        for count in row {
            let _ = write!(out, "{count:<width$}", width = GRID_COLUMN_WIDTH);
        }
        out.push('\n');
    }
    out
}

#[derive(Debug, Serialize)]
struct AxisReport {
    parameter: &'static str,
    values: Vec<f64>,
}

impl AxisReport {
    fn new(axis: &SweepAxis) -> Self {
        Self {
            parameter: axis.target.name(),
            values: axis.values(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SweepReport<'a> {
    axis_a: AxisReport,
    axis_b: AxisReport,
    summary: &'a SweepSummary,
    grid: Vec<Vec<u64>>,
}
