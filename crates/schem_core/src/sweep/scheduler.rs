//! Dispatches randomized trials over a fixed pool of worker slots.
//!
//! Each slot cycles `Idle → Dispatched → Idle`. The controller draws every
//! trial's parameters itself, in trial order, so the folded grid does not
//! depend on the pool size or on the order in which workers finish. Workers
//! own their local grid while dispatched and hand it back over a channel;
//! only the controller ever touches the shared grid.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Instant;

use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{SuccessGrid, SweepAxis, SweepProgress};
use crate::annulus::TrialModel;
use crate::error::{ModelError, SweepError};
use crate::model::{ModelParameters, Randomizer, ScalarParam};

/// Default odds (1 in N) of saving a snapshot of an evaluated cell
pub const DEFAULT_SNAPSHOT_ODDS: u32 = 200;

/// Configuration of a two-axis randomized sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// First axis; one grid row per step
    pub axis_a: SweepAxis,
    /// Second axis; one grid column per step
    pub axis_b: SweepAxis,
    /// Number of randomized trials
    pub trials: usize,
    /// Number of worker slots
    pub pool_size: usize,
    /// Seed for the trial draws (random when unset)
    pub seed: Option<u64>,
    /// 1-in-N chance of persisting a snapshot per cell; 0 disables snapshots
    pub snapshot_odds: u32,
    /// Directory for snapshots; snapshots are skipped when unset
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            axis_a: SweepAxis::new(ScalarParam::OutflowFraction, 0.0, 0.5, 5),
            axis_b: SweepAxis::new(ScalarParam::CoolingRate, 0.01, 0.1, 5),
            trials: 100,
            pool_size: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            seed: None,
            snapshot_odds: DEFAULT_SNAPSHOT_ODDS,
            snapshot_dir: None,
        }
    }
}

/// Totals gathered over a completed sweep
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepSummary {
    /// Seed the trial draws were made from
    pub seed: u64,
    pub trials: usize,
    pub cells_evaluated: u64,
    pub cells_passed: u64,
    /// Cells whose model could not be built or evaluated
    pub cells_failed: u64,
    pub snapshots_written: u64,
    pub elapsed_secs: f64,
}

#[derive(Debug, Clone)]
struct TrialJob {
    trial: usize,
    slot: usize,
    params: ModelParameters,
    seed: u64,
}

#[derive(Debug, Clone, Default)]
struct TrialStats {
    evaluated: u64,
    passed: u64,
    failed: u64,
    snapshots: u64,
}

#[derive(Debug)]
struct TrialOutcome {
    slot: usize,
    trial: usize,
    grid: SuccessGrid,
    stats: TrialStats,
}

#[derive(Debug, Clone)]
struct SnapshotPolicy {
    odds: u32,
    dir: Option<PathBuf>,
}

impl SnapshotPolicy {
    fn should_save<R: Rng>(&self, rng: &mut R) -> Option<&Path> {
        let dir = self.dir.as_deref()?;
        if self.odds == 0 {
            return None;
        }
        (rng.random_range(0..self.odds) == 0).then_some(dir)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Idle,
    Dispatched { trial: usize },
}

#[derive(Debug)]
struct Slot {
    state: SlotState,
    /// Local grid, parked here while the slot is idle
    grid: Option<SuccessGrid>,
}

/// Runs randomized trials across a fixed pool and folds their grids
#[derive(Debug, Clone)]
pub struct GridSweepScheduler {
    config: SweepConfig,
}

impl GridSweepScheduler {
    pub fn new(config: SweepConfig) -> Result<Self, SweepError> {
        config.axis_a.validate()?;
        config.axis_b.validate()?;
        if config.pool_size == 0 {
            return Err(SweepError::InvalidPoolSize);
        }
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Zeroed grid matching the sweep axes
    #[must_use]
    pub fn new_grid(&self) -> SuccessGrid {
        SuccessGrid::zeros(self.config.axis_a.steps, self.config.axis_b.steps)
    }

    /// Run every trial and fold the results into `grid`.
    ///
    /// Returns once all slots have drained.
    pub fn run<M: TrialModel + 'static>(
        &self,
        base: &ModelParameters,
        randomizer: &Randomizer,
        grid: &mut SuccessGrid,
        progress: Option<&SweepProgress>,
    ) -> Result<SweepSummary, SweepError> {
        let expected = self.new_grid().shape();
        if grid.shape() != expected {
            return Err(SweepError::ShapeMismatch {
                expected,
                found: grid.shape(),
            });
        }

        let seed = self.config.seed.unwrap_or_else(|| rand::rng().next_u64());
        if let Some(p) = progress {
            p.reset(self.config.trials);
        }
        tracing::info!(
            "Starting sweep: {} trials, {}x{} grid, {} workers, seed {}",
            self.config.trials,
            expected.0,
            expected.1,
            self.config.pool_size,
            seed
        );

        let mut controller = Controller {
            config: &self.config,
            grid,
            slots: (0..self.config.pool_size)
                .map(|_| Slot {
                    state: SlotState::Idle,
                    grid: Some(SuccessGrid::zeros(expected.0, expected.1)),
                })
                .collect(),
            summary: SweepSummary {
                seed,
                ..Default::default()
            },
            progress,
            start: Instant::now(),
        };
        let mut rng = SmallRng::seed_from_u64(seed);

        controller.dispatch_all::<M>(base, randomizer, &mut rng)?;

        let mut summary = controller.summary;
        summary.elapsed_secs = controller.start.elapsed().as_secs_f64();
        if summary.cells_failed > 0 {
            tracing::warn!(
                "{} of {} cells failed to evaluate and were counted as unsuccessful",
                summary.cells_failed,
                summary.cells_evaluated
            );
        }
        tracing::info!(
            "Sweep finished: {} trials, {} of {} cells passed in {:.1}s",
            summary.trials,
            summary.cells_passed,
            summary.cells_evaluated,
            summary.elapsed_secs
        );
        Ok(summary)
    }
}

struct Controller<'a> {
    config: &'a SweepConfig,
    grid: &'a mut SuccessGrid,
    slots: Vec<Slot>,
    summary: SweepSummary,
    progress: Option<&'a SweepProgress>,
    start: Instant,
}

impl Controller<'_> {
    fn draw(
        &self,
        trial: usize,
        slot: usize,
        base: &ModelParameters,
        randomizer: &Randomizer,
        rng: &mut SmallRng,
    ) -> Result<TrialJob, SweepError> {
        let params = randomizer.draw(base, rng)?;
        Ok(TrialJob {
            trial,
            slot,
            params,
            seed: rng.next_u64(),
        })
    }

    fn snapshot_policy(&self) -> SnapshotPolicy {
        SnapshotPolicy {
            odds: self.config.snapshot_odds,
            dir: self.config.snapshot_dir.clone(),
        }
    }

    /// Take the slot's parked grid, zeroed, and mark the slot dispatched
    fn claim(&mut self, slot: usize, trial: usize) -> SuccessGrid {
        let (rows, cols) = self.grid.shape();
        let mut local = self.slots[slot]
            .grid
            .take()
            .unwrap_or_else(|| SuccessGrid::zeros(rows, cols));
        local.clear();
        self.slots[slot].state = SlotState::Dispatched { trial };
        if let Some(p) = self.progress {
            p.mark_dispatched();
        }
        local
    }

    /// Fold a finished trial into the shared grid and return its slot to idle
    fn complete(&mut self, outcome: TrialOutcome) -> Result<(), SweepError> {
        self.grid.fold(&outcome.grid)?;

        let stats = &outcome.stats;
        self.summary.trials += 1;
        self.summary.cells_evaluated += stats.evaluated;
        self.summary.cells_passed += stats.passed;
        self.summary.cells_failed += stats.failed;
        self.summary.snapshots_written += stats.snapshots;

        let slot = &mut self.slots[outcome.slot];
        debug_assert_eq!(
            slot.state,
            SlotState::Dispatched {
                trial: outcome.trial
            }
        );
        slot.state = SlotState::Idle;
        slot.grid = Some(outcome.grid);

        if let Some(p) = self.progress {
            p.mark_completed();
        }
        Ok(())
    }

    fn log_progress(&self, trial: usize) {
        let interval = self.config.pool_size + 1;
        if trial % interval != 0 {
            return;
        }
        let elapsed = self.start.elapsed().as_secs_f64();
        let done = self.summary.trials;
        let remaining = self.config.trials.saturating_sub(done);
        if done > 0 {
            let eta = elapsed / done as f64 * remaining as f64;
            tracing::info!(
                "Trial {}/{} dispatched, {} folded, {:.1}s elapsed, ~{:.1}s remaining",
                trial + 1,
                self.config.trials,
                done,
                elapsed,
                eta
            );
        } else {
            tracing::info!(
                "Trial {}/{} dispatched, {:.1}s elapsed",
                trial + 1,
                self.config.trials,
                elapsed
            );
        }
    }

    #[cfg(feature = "parallel")]
    fn dispatch_all<M: TrialModel + 'static>(
        &mut self,
        base: &ModelParameters,
        randomizer: &Randomizer,
        rng: &mut SmallRng,
    ) -> Result<(), SweepError> {
        use std::sync::mpsc::channel;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.pool_size)
            .thread_name(|i| format!("sweep-worker-{i}"))
            .build()
            .map_err(|e| SweepError::ThreadPool(e.to_string()))?;
        let (done_tx, done_rx) = channel::<TrialOutcome>();

        for trial in 0..self.config.trials {
            let idle = self.slots.iter().position(|s| s.state == SlotState::Idle);
            let slot = match idle {
                Some(slot) => slot,
                None => {
                    // Block until a worker hands its grid back
                    let outcome = done_rx.recv().map_err(|_| self.lost_worker())?;
                    let slot = outcome.slot;
                    self.complete(outcome)?;
                    slot
                }
            };

            let job = self.draw(trial, slot, base, randomizer, rng)?;
            let mut local = self.claim(slot, trial);
            let axes = (self.config.axis_a.clone(), self.config.axis_b.clone());
            let policy = self.snapshot_policy();
            let tx = done_tx.clone();

            pool.spawn(move || {
                let stats = run_trial::<M>(&job, &axes.0, &axes.1, &policy, &mut local);
                let _ = tx.send(TrialOutcome {
                    slot: job.slot,
                    trial: job.trial,
                    grid: local,
                    stats,
                });
            });

            self.log_progress(trial);
        }

        drop(done_tx);
        while self
            .slots
            .iter()
            .any(|s| matches!(s.state, SlotState::Dispatched { .. }))
        {
            let outcome = done_rx.recv().map_err(|_| self.lost_worker())?;
            self.complete(outcome)?;
        }
        tracing::debug!("All worker slots drained");
        Ok(())
    }

    #[cfg(not(feature = "parallel"))]
    fn dispatch_all<M: TrialModel + 'static>(
        &mut self,
        base: &ModelParameters,
        randomizer: &Randomizer,
        rng: &mut SmallRng,
    ) -> Result<(), SweepError> {
        let policy = self.snapshot_policy();
        for trial in 0..self.config.trials {
            let job = self.draw(trial, 0, base, randomizer, rng)?;
            let mut local = self.claim(0, trial);
            let stats = run_trial::<M>(
                &job,
                &self.config.axis_a,
                &self.config.axis_b,
                &policy,
                &mut local,
            );
            self.complete(TrialOutcome {
                slot: 0,
                trial,
                grid: local,
                stats,
            })?;
            self.log_progress(trial);
        }
        Ok(())
    }

    #[cfg(feature = "parallel")]
    fn lost_worker(&self) -> SweepError {
        let slot = self
            .slots
            .iter()
            .position(|s| matches!(s.state, SlotState::Dispatched { .. }))
            .unwrap_or(0);
        SweepError::WorkerLost { slot }
    }
}

/// Evaluate one trial over the full grid, counting successes into `local`.
fn run_trial<M: TrialModel>(
    job: &TrialJob,
    axis_a: &SweepAxis,
    axis_b: &SweepAxis,
    policy: &SnapshotPolicy,
    local: &mut SuccessGrid,
) -> TrialStats {
    let mut rng = SmallRng::seed_from_u64(job.seed);
    let mut stats = TrialStats::default();

    for i in 0..axis_a.steps {
        let row_params = axis_a.apply(&job.params, i);
        for j in 0..axis_b.steps {
            let params = axis_b.apply(&row_params, j);
            let snapshot_dir = policy.should_save(&mut rng);

            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                evaluate_cell::<M>(&params, snapshot_dir, job.trial, i, j)
            }));
            stats.evaluated += 1;

            match result {
                Ok(Ok(cell)) => {
                    if cell.passed {
                        local.increment(i, j);
                        stats.passed += 1;
                    }
                    if cell.snapshot_written {
                        stats.snapshots += 1;
                    }
                }
                Ok(Err(e)) => {
                    stats.failed += 1;
                    tracing::debug!("Trial {} cell ({i}, {j}) failed: {e}", job.trial);
                }
                Err(_) => {
                    stats.failed += 1;
                    tracing::warn!("Trial {} cell ({i}, {j}) panicked", job.trial);
                }
            }
        }
    }

    stats
}

struct CellResult {
    passed: bool,
    snapshot_written: bool,
}

fn evaluate_cell<M: TrialModel>(
    params: &ModelParameters,
    snapshot_dir: Option<&Path>,
    trial: usize,
    i: usize,
    j: usize,
) -> Result<CellResult, ModelError> {
    let mut model = M::from_parameters(params)?;
    let passed = model.evaluate_final_state();

    let mut snapshot_written = false;
    if let Some(dir) = snapshot_dir {
        let path = dir.join(snapshot_name(trial, i, j, passed));
        match model.evolve() {
            Ok(()) => match model.persist(&path) {
                Ok(()) => snapshot_written = true,
                Err(e) => tracing::debug!("Snapshot {} not written: {e}", path.display()),
            },
            Err(e) => tracing::debug!("Snapshot {} not evolved: {e}", path.display()),
        }
    }

    Ok(CellResult {
        passed,
        snapshot_written,
    })
}

/// File name of the snapshot for trial `trial`, cell `(i, j)`
#[must_use]
pub fn snapshot_name(trial: usize, i: usize, j: usize, passed: bool) -> String {
    let status = if passed { "successful" } else { "unsuccessful" };
    format!("trial_{trial:05}_{i}_{j}_{status}.dat")
}
