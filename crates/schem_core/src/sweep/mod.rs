//! Randomized two-axis parameter sweep.
//!
//! A sweep runs N randomized trials. Each trial evaluates one model per cell
//! of the grid spanned by two [`SweepAxis`] values and counts the cells whose
//! final state passes. Per-trial counts are folded into a shared
//! [`SuccessGrid`] by [`GridSweepScheduler`].
//!
//! ```ignore
//! use schem_core::annulus::Annulus;
//! use schem_core::sweep::{GridSweepScheduler, SweepConfig};
//!
//! let scheduler = GridSweepScheduler::new(SweepConfig::default())?;
//! let mut grid = scheduler.new_grid();
//! let summary = scheduler.run::<Annulus>(&params, &randomizer, &mut grid, None)?;
//! ```

mod axis;
mod grid;
mod progress;
mod scheduler;

pub use axis::SweepAxis;
pub use grid::SuccessGrid;
pub use progress::SweepProgress;
pub use scheduler::{
    DEFAULT_SNAPSHOT_ODDS, GridSweepScheduler, SweepConfig, SweepSummary, snapshot_name,
};
